//! Topology Snapshots
//!
//! The graph and the alias table are persisted together as one JSON
//! document. Device and serial keys are not stored; they are rebuilt from
//! the disks on load.

use crate::domain::entities::{Controller, Disk, Enclosure};
use crate::domain::ports::SnapshotStore;
use crate::error::{Error, Result};
use crate::hardware::registry::{AliasTable, Topology};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Persisted form of an inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub saved_at: DateTime<Utc>,
    pub controllers: Vec<Controller>,
    pub enclosures: Vec<Enclosure>,
    pub disks: Vec<Disk>,
    #[serde(default)]
    pub aliases: AliasTable,
}

impl Snapshot {
    pub fn from_state(topology: &Topology, aliases: &AliasTable) -> Self {
        Self {
            saved_at: Utc::now(),
            controllers: topology.controllers().cloned().collect(),
            enclosures: topology.enclosures().cloned().collect(),
            disks: topology.disks().cloned().collect(),
            aliases: aliases.clone(),
        }
    }

    /// Rebuild the graph, re-keying every disk
    pub fn into_state(self) -> (Topology, AliasTable) {
        let topology = Topology::from_parts(self.controllers, self.enclosures, self.disks);
        (topology, self.aliases)
    }
}

// =============================================================================
// JSON File Store
// =============================================================================

/// Stores the snapshot as pretty JSON at a fixed path
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn save_error(&self, reason: impl ToString) -> Error {
        Error::SnapshotSave {
            path: self.location(),
            reason: reason.to_string(),
        }
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let body = serde_json::to_vec_pretty(snapshot).map_err(|e| self.save_error(e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.save_error(e))?;
        }

        // Readers never observe a partially written file
        let temp = self.temp_path();
        let mut file = fs::File::create(&temp).map_err(|e| self.save_error(e))?;
        file.write_all(&body).map_err(|e| self.save_error(e))?;
        file.sync_all().map_err(|e| self.save_error(e))?;
        fs::rename(&temp, &self.path).map_err(|e| self.save_error(e))?;

        info!(
            path = %self.path.display(),
            disks = snapshot.disks.len(),
            aliases = snapshot.aliases.len(),
            "snapshot saved"
        );
        Ok(())
    }

    fn load(&self) -> Result<Snapshot> {
        let load_error = |reason: String| Error::SnapshotLoad {
            path: self.location(),
            reason,
        };

        let body = fs::read(&self.path).map_err(|e| load_error(e.to_string()))?;
        let snapshot: Snapshot =
            serde_json::from_slice(&body).map_err(|e| load_error(e.to_string()))?;

        debug!(
            path = %self.path.display(),
            saved_at = %snapshot.saved_at,
            disks = snapshot.disks.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
