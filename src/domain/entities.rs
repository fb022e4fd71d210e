//! Topology Entities
//!
//! Controllers, enclosures and disks as discovered on the host. Disks and
//! enclosures refer to their owners by id; the owners themselves live in
//! the [`Topology`](crate::hardware::registry::Topology) graph.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Controller
// =============================================================================

/// A host storage adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controller {
    /// Index assigned by the controller utility
    pub id: u32,
    /// Adapter type (e.g. SAS2008)
    pub adapter_type: String,
    pub vendor_id: String,
    pub device_id: String,
    pub pci_address: String,
    pub subsys_vendor_id: String,
    pub subsys_device_id: String,
}

// =============================================================================
// Enclosure
// =============================================================================

/// A drive chassis wired to one controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enclosure {
    /// Logical id, lower case
    pub id: String,
    /// Index relative to the owning controller
    pub index: u32,
    /// Number of slots
    pub slot_count: u32,
    /// Owning controller id
    pub controller: u32,
}

impl Enclosure {
    /// `controller:index` form accepted by the resolver
    pub fn address(&self) -> String {
        format!("{}:{}", self.controller, self.index)
    }
}

// =============================================================================
// Disk
// =============================================================================

/// Physical coordinates of a slot: controller, enclosure index, slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotAddress {
    pub controller: u32,
    pub enclosure_index: u32,
    pub slot: u32,
}

impl fmt::Display for SlotAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}:{:02}", self.controller, self.enclosure_index, self.slot)
    }
}

/// A physical disk, identified by its normalized vendor serial
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disk {
    /// Normalized serial (canonical key)
    pub serial: String,
    /// Owning controller id
    pub controller: u32,
    /// Owning enclosure logical id
    pub enclosure: String,
    /// Enclosure index relative to the controller
    pub enclosure_index: u32,
    pub slot: u32,
    /// Lifecycle state as reported by the controller, e.g. `Optimal (OPT)`
    pub state: String,
    pub size_mb: u64,
    pub size_sectors: u64,
    pub manufacturer: String,
    pub model: String,
    pub firmware: String,
    pub protocol: String,
    pub drive_type: String,
    /// OS device path, once the device mapping has been correlated
    pub device: Option<String>,
    /// Pool name -> parent vdev group label
    #[serde(default)]
    pub pools: BTreeMap<String, String>,
}

impl Disk {
    pub fn address(&self) -> SlotAddress {
        SlotAddress {
            controller: self.controller,
            enclosure_index: self.enclosure_index,
            slot: self.slot,
        }
    }

    /// Capacity in bytes
    pub fn size_bytes(&self) -> u64 {
        self.size_mb.saturating_mul(1024 * 1024)
    }

    /// Device node name without its directory, e.g. `c1t7d0`
    pub fn short_device<'a>(&'a self, device_dir: &str) -> Option<&'a str> {
        self.device
            .as_deref()
            .map(|d| d.strip_prefix(device_dir).unwrap_or(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk() -> Disk {
        Disk {
            serial: "ABC123".into(),
            controller: 1,
            enclosure: "500003".into(),
            enclosure_index: 2,
            slot: 7,
            state: "Optimal (OPT)".into(),
            size_mb: 2,
            size_sectors: 4096,
            manufacturer: "ATA".into(),
            model: "WDC WD2003FYYS-0".into(),
            firmware: "1D01".into(),
            protocol: "SATA".into(),
            drive_type: "SATA_HDD".into(),
            device: Some("/dev/rdsk/c1t7d0".into()),
            pools: BTreeMap::new(),
        }
    }

    #[test]
    fn test_slot_address_display() {
        assert_eq!(disk().address().to_string(), "1:02:07");
    }

    #[test]
    fn test_short_device() {
        let d = disk();
        assert_eq!(d.short_device("/dev/rdsk/"), Some("c1t7d0"));
        assert_eq!(d.size_bytes(), 2 * 1024 * 1024);
    }
}
