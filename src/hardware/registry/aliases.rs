//! Enclosure Aliases
//!
//! Operator-chosen names for enclosures. An alias names exactly one
//! enclosure and an enclosure carries at most one alias, so lookups work
//! in both directions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Alias -> enclosure logical id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasTable {
    aliases: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `alias` to `enclosure_id`. Any previous alias of the enclosure
    /// and any previous binding of the alias are replaced.
    pub fn set(&mut self, alias: impl Into<String>, enclosure_id: impl Into<String>) {
        let alias = alias.into();
        let enclosure_id = enclosure_id.into();
        self.aliases.retain(|_, target| *target != enclosure_id);
        self.aliases.insert(alias, enclosure_id);
    }

    /// Enclosure bound to an alias
    pub fn enclosure_for(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    /// Alias of an enclosure
    pub fn alias_for(&self, enclosure_id: &str) -> Option<&str> {
        self.aliases
            .iter()
            .find(|(_, target)| target.as_str() == enclosure_id)
            .map(|(alias, _)| alias.as_str())
    }

    /// Remove by alias, or failing that by enclosure id. Returns the removed
    /// `(alias, enclosure_id)` pair.
    pub fn remove(&mut self, alias_or_enclosure: &str) -> Option<(String, String)> {
        if let Some(target) = self.aliases.remove(alias_or_enclosure) {
            return Some((alias_or_enclosure.to_string(), target));
        }
        let alias = self.alias_for(alias_or_enclosure)?.to_string();
        self.aliases.remove(&alias).map(|target| (alias, target))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, e)| (a.as_str(), e.as_str()))
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl FromIterator<(String, String)> for AliasTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (alias, enclosure) in iter {
            table.set(alias, enclosure);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_both_directions() {
        let mut table = AliasTable::new();
        table.set("front", "500605b0:0272b8f0");

        assert_eq!(table.enclosure_for("front"), Some("500605b0:0272b8f0"));
        assert_eq!(table.alias_for("500605b0:0272b8f0"), Some("front"));
        assert_eq!(table.enclosure_for("back"), None);
    }

    #[test]
    fn test_enclosure_keeps_single_alias() {
        let mut table = AliasTable::new();
        table.set("front", "e1");
        table.set("shelf-a", "e1");

        assert_eq!(table.len(), 1);
        assert_eq!(table.alias_for("e1"), Some("shelf-a"));
        assert_eq!(table.enclosure_for("front"), None);
    }

    #[test]
    fn test_alias_rebinds_to_new_enclosure() {
        let mut table = AliasTable::new();
        table.set("front", "e1");
        table.set("front", "e2");

        assert_eq!(table.enclosure_for("front"), Some("e2"));
        assert_eq!(table.alias_for("e1"), None);
    }

    #[test]
    fn test_remove_by_alias_or_enclosure() {
        let mut table: AliasTable = [
            ("front".to_string(), "e1".to_string()),
            ("back".to_string(), "e2".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(table.remove("front"), Some(("front".into(), "e1".into())));
        assert_eq!(table.remove("e2"), Some(("back".into(), "e2".into())));
        assert_eq!(table.remove("e3"), None);
        assert!(table.is_empty());
    }
}
