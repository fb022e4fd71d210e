//! Target Resolution
//!
//! Maps operator tokens to enclosures and disks. Every operation is a
//! read-only query over the topology and the alias table.
//!
//! Accepted forms:
//! - enclosure: alias, logical id (any case), `controller:index`
//! - disk: serial, device path or short device name (any case),
//!   `<enclosure>:slot`, `controller:enclosure-index:slot`
//! - groups: `all`, an enclosure, a layout glyph over an enclosure

use crate::domain::entities::{Disk, Enclosure};
use crate::error::{Error, Result};
use crate::hardware::registry::{AliasTable, Topology};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Token selecting every disk
pub const ALL_TOKEN: &str = "all";

// =============================================================================
// Layout Glyphs
// =============================================================================

/// Letters drawable with locate LEDs on a 4x6 enclosure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Glyph {
    N,
    X,
}

impl Glyph {
    pub const ALL: [Glyph; 2] = [Glyph::N, Glyph::X];

    /// Slots lit to draw the glyph
    pub fn slots(self) -> &'static [u32] {
        match self {
            Glyph::N => &[0, 1, 2, 3, 4, 5, 9, 10, 13, 14, 18, 19, 20, 21, 22, 23],
            Glyph::X => &[0, 1, 4, 5, 8, 9, 14, 15, 18, 19, 22, 23],
        }
    }

    pub fn contains(self, slot: u32) -> bool {
        self.slots().contains(&slot)
    }
}

impl fmt::Display for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Glyph::N => write!(f, "N"),
            Glyph::X => write!(f, "X"),
        }
    }
}

impl FromStr for Glyph {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "N" | "n" => Ok(Glyph::N),
            "X" | "x" => Ok(Glyph::X),
            other => Err(Error::UnknownGlyph {
                glyph: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Read-only view used to answer operator queries
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    topology: &'a Topology,
    aliases: &'a AliasTable,
    device_dir: &'a str,
}

impl<'a> Resolver<'a> {
    pub fn new(topology: &'a Topology, aliases: &'a AliasTable, device_dir: &'a str) -> Self {
        Self {
            topology,
            aliases,
            device_dir,
        }
    }

    /// Resolve an enclosure by alias, logical id or `controller:index`
    pub fn resolve_enclosure(&self, token: &str) -> Option<&'a Enclosure> {
        let token = token.trim();
        let token = self.aliases.enclosure_for(token).unwrap_or(token);

        if let Some(enclosure) = self.topology.enclosure(token) {
            return Some(enclosure);
        }
        if let Some(enclosure) = self.topology.enclosure(&token.to_lowercase()) {
            return Some(enclosure);
        }

        let (controller, index) = token.split_once(':')?;
        let controller: u32 = controller.trim().parse().ok()?;
        let index: u32 = index.trim().parse().ok()?;

        let mut matches = self
            .topology
            .enclosures()
            .filter(|e| e.controller == controller && e.index == index);
        let found = matches.next()?;
        match matches.next() {
            Some(_) => None,
            None => Some(found),
        }
    }

    /// Resolve disks by key or by coordinates.
    ///
    /// A key hit returns exactly that disk. Coordinates may match several
    /// disks; malformed input matches nothing.
    pub fn resolve_disk(&self, token: &str) -> Vec<&'a Disk> {
        let token = token.trim();
        if token.is_empty() {
            return Vec::new();
        }

        let prefixed = format!("{}{}", self.device_dir, token);
        let candidates = [
            token.to_string(),
            prefixed,
            token.to_uppercase(),
            token.to_lowercase(),
        ];
        if let Some(disk) = candidates.iter().find_map(|key| self.topology.disk(key)) {
            return vec![disk];
        }

        let parts: Vec<&str> = token.split(':').collect();
        match parts.as_slice() {
            [enclosure, slot] => {
                let (Some(enclosure), Ok(slot)) =
                    (self.resolve_enclosure(enclosure), slot.trim().parse::<u32>())
                else {
                    return Vec::new();
                };
                self.topology
                    .disks()
                    .filter(|d| d.enclosure == enclosure.id && d.slot == slot)
                    .collect()
            }
            [controller, enclosure_index, slot] => {
                let (Ok(controller), Ok(enclosure_index), Ok(slot)) = (
                    controller.trim().parse::<u32>(),
                    enclosure_index.trim().parse::<u32>(),
                    slot.trim().parse::<u32>(),
                ) else {
                    return Vec::new();
                };
                self.topology
                    .disks()
                    .filter(|d| {
                        d.controller == controller
                            && d.enclosure_index == enclosure_index
                            && d.slot == slot
                    })
                    .collect()
            }
            _ => Vec::new(),
        }
    }

    /// Every disk of the enclosure a token resolves to, ordered by slot
    pub fn enclosure_disks(&self, token: &str) -> Option<Vec<&'a Disk>> {
        let enclosure = self.resolve_enclosure(token)?;
        Some(self.topology.disks_in_enclosure(&enclosure.id))
    }

    /// Resolve an indicator target: `all`, an enclosure, or disks
    pub fn resolve_targets(&self, token: &str) -> Vec<&'a Disk> {
        let token = token.trim();
        if token.eq_ignore_ascii_case(ALL_TOKEN) {
            return self.topology.disks().collect();
        }
        if let Some(disks) = self.enclosure_disks(token) {
            return disks;
        }
        self.resolve_disk(token)
    }

    /// Disks of an enclosure sitting in the slots of a glyph
    pub fn resolve_glyph(&self, glyph: Glyph, enclosure: &str) -> Result<Vec<&'a Disk>> {
        let disks = self
            .enclosure_disks(enclosure)
            .ok_or_else(|| Error::EnclosureNotFound {
                token: enclosure.to_string(),
            })?;
        Ok(disks.into_iter().filter(|d| glyph.contains(d.slot)).collect())
    }

    /// Completion candidates for indicator targets
    pub fn target_candidates(&self) -> BTreeSet<String> {
        let mut candidates: BTreeSet<String> = [ALL_TOKEN.to_string()].into();
        candidates.extend(self.aliases.iter().map(|(alias, _)| alias.to_string()));
        for disk in self.topology.disks() {
            candidates.insert(disk.serial.clone());
            candidates.insert(format!(
                "{}:{}:{}",
                disk.controller, disk.enclosure_index, disk.slot
            ));
            if let Some(short) = disk.short_device(self.device_dir) {
                candidates.insert(short.to_string());
            }
        }
        for enclosure in self.topology.enclosures() {
            candidates.insert(enclosure.address());
        }
        candidates
    }
}
