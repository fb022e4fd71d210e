//! Topology Graph
//!
//! Holds the controllers, enclosures and disks of one discovery pass.
//! Disks live in a single arena; every lookup key (serial, device path)
//! maps to an arena slot, so all keys of a disk reach the same record.

use crate::domain::entities::{Controller, Disk, Enclosure};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Index of a disk in the topology arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiskId(usize);

/// The discovered entity graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    controllers: BTreeMap<u32, Controller>,
    enclosures: BTreeMap<String, Enclosure>,
    disks: Vec<Disk>,
    /// Serial and device-path keys -> arena slot
    disk_keys: HashMap<String, DiskId>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from flat entity lists, re-indexing every disk under
    /// its serial and, when known, its device path.
    pub fn from_parts(
        controllers: impl IntoIterator<Item = Controller>,
        enclosures: impl IntoIterator<Item = Enclosure>,
        disks: impl IntoIterator<Item = Disk>,
    ) -> Self {
        let mut topology = Self::new();
        for controller in controllers {
            topology.insert_controller(controller);
        }
        for enclosure in enclosures {
            topology.insert_enclosure(enclosure);
        }
        for disk in disks {
            let device = disk.device.clone();
            let id = topology.insert_disk(disk);
            if let Some(device) = device {
                topology.attach_device(id, device);
            }
        }
        topology
    }

    // =========================================================================
    // Controllers & Enclosures
    // =========================================================================

    pub fn insert_controller(&mut self, controller: Controller) {
        self.controllers.insert(controller.id, controller);
    }

    pub fn controller(&self, id: u32) -> Option<&Controller> {
        self.controllers.get(&id)
    }

    pub fn controllers(&self) -> impl Iterator<Item = &Controller> {
        self.controllers.values()
    }

    pub fn controller_ids(&self) -> Vec<u32> {
        self.controllers.keys().copied().collect()
    }

    /// Insert an enclosure under its (lower-case) logical id
    pub fn insert_enclosure(&mut self, enclosure: Enclosure) {
        self.enclosures.insert(enclosure.id.clone(), enclosure);
    }

    pub fn enclosure(&self, id: &str) -> Option<&Enclosure> {
        self.enclosures.get(id)
    }

    pub fn enclosures(&self) -> impl Iterator<Item = &Enclosure> {
        self.enclosures.values()
    }

    // =========================================================================
    // Disks
    // =========================================================================

    /// Insert a disk under its serial. A disk already known under that
    /// serial is replaced in place and keeps its arena slot.
    pub fn insert_disk(&mut self, disk: Disk) -> DiskId {
        if let Some(&id) = self.disk_keys.get(&disk.serial) {
            if let Some(old) = self.disks[id.0].device.take() {
                self.disk_keys.remove(&old);
            }
            self.disks[id.0] = disk;
            return id;
        }

        let id = DiskId(self.disks.len());
        self.disk_keys.insert(disk.serial.clone(), id);
        self.disks.push(disk);
        id
    }

    /// Record the device path of a disk and index the disk under it.
    ///
    /// A path already claimed by another disk moves to this one; the other
    /// disk loses its device path. An id that is not in this topology is
    /// ignored and reported as `false`.
    pub fn attach_device(&mut self, id: DiskId, device: String) -> bool {
        let Some(serial) = self.disks.get(id.0).map(|d| d.serial.clone()) else {
            warn!(device = %device, id = id.0, "device attach for unknown disk");
            return false;
        };

        if let Some(&previous) = self.disk_keys.get(&device) {
            if previous != id {
                if let Some(stale) = self.disks.get_mut(previous.0) {
                    warn!(
                        device = %device,
                        stale = %stale.serial,
                        serial = %serial,
                        "device path moves to another disk"
                    );
                    stale.device = None;
                }
            }
        }

        if let Some(old) = self.disks[id.0].device.replace(device.clone()) {
            if old != device {
                self.disk_keys.remove(&old);
            }
        }
        self.disk_keys.insert(device, id);
        true
    }

    /// Arena slot for a serial or device-path key
    pub fn disk_id(&self, key: &str) -> Option<DiskId> {
        self.disk_keys.get(key).copied()
    }

    /// Disk stored under a serial or device-path key
    pub fn disk(&self, key: &str) -> Option<&Disk> {
        self.disk_id(key).map(|id| &self.disks[id.0])
    }

    /// Mutable access through any key of the disk
    pub fn disk_mut(&mut self, key: &str) -> Option<&mut Disk> {
        let id = self.disk_id(key)?;
        self.disks.get_mut(id.0)
    }

    /// Every disk once, in discovery order
    pub fn disks(&self) -> impl Iterator<Item = &Disk> {
        self.disks.iter()
    }

    /// Every lookup key, serials and device paths alike
    pub fn disk_keys(&self) -> impl Iterator<Item = &str> {
        self.disk_keys.keys().map(String::as_str)
    }

    /// Disks of one enclosure, ordered by slot
    pub fn disks_in_enclosure(&self, enclosure_id: &str) -> Vec<&Disk> {
        let mut disks: Vec<&Disk> = self
            .disks
            .iter()
            .filter(|d| d.enclosure == enclosure_id)
            .collect();
        disks.sort_by_key(|d| d.slot);
        disks
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    pub fn enclosure_count(&self) -> usize {
        self.enclosures.len()
    }

    pub fn disk_count(&self) -> usize {
        self.disks.len()
    }

    /// Sum of all disk capacities in bytes
    pub fn total_bytes(&self) -> u64 {
        self.disks.iter().map(Disk::size_bytes).sum()
    }
}
