//! Extracted Records
//!
//! The flat `field -> text` mapping every extractor emits. Records carry
//! no cross-source knowledge; the entity builder turns them into typed
//! entities.

use regex::{Captures, Regex};
use std::collections::BTreeMap;

/// One flat field mapping produced by an extractor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from the named groups of a regex match. Groups that
    /// did not participate in the match are left out.
    pub fn from_captures(re: &Regex, caps: &Captures<'_>) -> Self {
        let mut record = Self::new();
        for name in re.capture_names().flatten() {
            if let Some(m) = caps.name(name) {
                record.insert(name, m.as_str());
            }
        }
        record
    }

    /// Insert a field; the value is trimmed
    pub fn insert(&mut self, field: &str, value: &str) {
        self.fields.insert(field.to_string(), value.trim().to_string());
    }

    /// Builder-style insert
    pub fn with(mut self, field: &str, value: &str) -> Self {
        self.insert(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Field parsed as an unsigned integer
    pub fn get_u32(&self, field: &str) -> Option<u32> {
        self.get(field)?.parse().ok()
    }

    pub fn get_u64(&self, field: &str) -> Option<u64> {
        self.get(field)?.parse().ok()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}
