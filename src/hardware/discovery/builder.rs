//! Entity Builder
//!
//! Turns extracted records into typed entities: numeric fields are
//! parsed, strings trimmed, enclosure ids lower-cased and serials
//! normalized. A record missing a required field yields `None`.

use super::record::Record;
use crate::config::SerialRule;
use crate::domain::entities::{Controller, Disk, Enclosure};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

// =============================================================================
// Serial Normalizer
// =============================================================================

/// Brings serials from every source to one spelling: trimmed, upper case,
/// known vendor prefixes rewritten.
#[derive(Debug, Clone, Default)]
pub struct SerialNormalizer {
    rules: Vec<SerialRule>,
}

impl SerialNormalizer {
    pub fn new(rules: Vec<SerialRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|r| SerialRule::new(r.prefix.to_uppercase(), r.replacement.to_uppercase()))
            .collect();
        Self { rules }
    }

    pub fn normalize(&self, raw: &str) -> String {
        let serial = raw.trim().to_uppercase();
        for rule in &self.rules {
            if let Some(rest) = serial.strip_prefix(rule.prefix.as_str()) {
                return format!("{}{}", rule.replacement, rest);
            }
        }
        serial
    }
}

// =============================================================================
// Builders
// =============================================================================

/// Text field, empty when absent
fn text(record: &Record, field: &str) -> String {
    record.get(field).unwrap_or_default().to_string()
}

/// Controller from a `LIST` record
pub fn build_controller(record: &Record) -> Option<Controller> {
    let Some(id) = record.get_u32("id") else {
        debug!(?record, "controller record without numeric id");
        return None;
    };

    Some(Controller {
        id,
        adapter_type: text(record, "adapter_type"),
        vendor_id: text(record, "vendor_id"),
        device_id: text(record, "device_id"),
        pci_address: text(record, "pci_address"),
        subsys_vendor_id: text(record, "subsys_vendor_id"),
        subsys_device_id: text(record, "subsys_device_id"),
    })
}

/// Enclosure from a `DISPLAY` record, owned by `controller`
pub fn build_enclosure(record: &Record, controller: u32) -> Option<Enclosure> {
    let id = record.get("id").filter(|id| !id.is_empty())?.to_lowercase();
    let Some(index) = record.get_u32("index") else {
        debug!(id = %id, "enclosure record without numeric index");
        return None;
    };

    Some(Enclosure {
        id,
        index,
        slot_count: record.get_u32("slot_count").unwrap_or(0),
        controller,
    })
}

/// Disk from a `DISPLAY` record.
///
/// `enclosures` maps the controller-local enclosure index to the enclosure
/// logical id, as built from the same dump.
pub fn build_disk(
    record: &Record,
    controller: u32,
    enclosures: &HashMap<u32, String>,
    normalizer: &SerialNormalizer,
) -> Option<Disk> {
    let serial = normalizer.normalize(record.get("serial")?);
    if serial.is_empty() {
        return None;
    }

    let (Some(enclosure_index), Some(slot), Some(size_mb), Some(size_sectors)) = (
        record.get_u32("enclosure_index"),
        record.get_u32("slot"),
        record.get_u64("size_mb"),
        record.get_u64("size_sectors"),
    ) else {
        debug!(serial = %serial, "disk record with non-numeric coordinates or capacity");
        return None;
    };

    let Some(enclosure) = enclosures.get(&enclosure_index) else {
        warn!(
            serial = %serial,
            controller,
            enclosure_index,
            "disk references an enclosure the controller did not report"
        );
        return None;
    };

    Some(Disk {
        serial,
        controller,
        enclosure: enclosure.clone(),
        enclosure_index,
        slot,
        state: text(record, "state"),
        size_mb,
        size_sectors,
        manufacturer: text(record, "manufacturer"),
        model: text(record, "model"),
        firmware: text(record, "firmware"),
        protocol: text(record, "protocol"),
        drive_type: text(record, "drive_type"),
        device: None,
        pools: BTreeMap::new(),
    })
}
