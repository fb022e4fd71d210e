//! Inventory
//!
//! Owns the live topology and alias table, and keeps the snapshot in step
//! with every discovery and alias change.

use crate::config::DiskmapConfig;
use crate::domain::entities::Enclosure;
use crate::domain::ports::{SnapshotStore, SnapshotStoreRef};
use crate::error::{Error, Result};
use crate::hardware::discovery::{Correlator, DiscoveryReport};
use crate::hardware::registry::{AliasTable, Topology};
use crate::hardware::resolver::Resolver;
use crate::snapshot::{JsonSnapshotStore, Snapshot};
use std::path::Path;
use tracing::{info, warn};

pub struct Inventory {
    topology: Topology,
    aliases: AliasTable,
    correlator: Correlator,
    store: SnapshotStoreRef,
    last_report: Option<DiscoveryReport>,
}

impl Inventory {
    /// Empty inventory; nothing is loaded or discovered
    pub fn new(correlator: Correlator, store: SnapshotStoreRef) -> Self {
        Self {
            topology: Topology::new(),
            aliases: AliasTable::new(),
            correlator,
            store,
            last_report: None,
        }
    }

    /// Restore from the snapshot, rediscovering when it cannot be read
    pub async fn open(correlator: Correlator, store: SnapshotStoreRef) -> Result<Self> {
        let mut inventory = Self::new(correlator, store);
        match inventory.store.load() {
            Ok(snapshot) => inventory.restore(snapshot),
            Err(e) if e.is_recoverable() => {
                warn!(
                    location = %inventory.store.location(),
                    error = %e,
                    "snapshot unavailable, rediscovering"
                );
                inventory.discover().await?;
            }
            Err(e) => return Err(e),
        }
        Ok(inventory)
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn config(&self) -> &DiskmapConfig {
        self.correlator.config()
    }

    /// Report of the last discovery run by this inventory
    pub fn last_report(&self) -> Option<&DiscoveryReport> {
        self.last_report.as_ref()
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.topology, &self.aliases, &self.config().device_dir)
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Rediscover the host. The live graph is replaced only when every stage
    /// succeeds; aliases survive.
    pub async fn discover(&mut self) -> Result<&DiscoveryReport> {
        let (topology, report) = self.correlator.discover().await?;

        for (alias, enclosure) in self.aliases.iter() {
            if topology.enclosure(enclosure).is_none() {
                warn!(alias, enclosure, "aliased enclosure not found by discovery");
            }
        }

        self.topology = topology;
        self.save()?;
        Ok(&*self.last_report.insert(report))
    }

    // =========================================================================
    // Aliases
    // =========================================================================

    /// Name an enclosure. Returns the enclosure the alias now points at.
    pub fn set_alias(&mut self, enclosure_token: &str, name: &str) -> Result<Enclosure> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Configuration("alias name is empty".to_string()));
        }
        let enclosure = self
            .resolver()
            .resolve_enclosure(enclosure_token)
            .cloned()
            .ok_or_else(|| Error::EnclosureNotFound {
                token: enclosure_token.to_string(),
            })?;

        self.aliases.set(name, enclosure.id.clone());
        info!(alias = name, enclosure = %enclosure.id, "alias set");
        self.save()?;
        Ok(enclosure)
    }

    /// Drop an alias, given either the alias or its enclosure id
    pub fn remove_alias(&mut self, alias_or_enclosure: &str) -> Result<(String, String)> {
        let token = alias_or_enclosure.trim();
        let removed = self
            .aliases
            .remove(token)
            .or_else(|| self.aliases.remove(&token.to_lowercase()))
            .ok_or_else(|| Error::NoMatch {
                token: token.to_string(),
            })?;

        info!(alias = %removed.0, enclosure = %removed.1, "alias removed");
        self.save()?;
        Ok(removed)
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_state(&self.topology, &self.aliases)
    }

    /// Persist to the configured store
    pub fn save(&self) -> Result<()> {
        self.store.save(&self.snapshot())
    }

    /// Replace the live state with the configured store's snapshot
    pub fn reload(&mut self) -> Result<()> {
        let snapshot = self.store.load()?;
        self.restore(snapshot);
        Ok(())
    }

    /// Persist to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        JsonSnapshotStore::new(path).save(&self.snapshot())
    }

    /// Replace the live state with an explicit file's contents
    pub fn load_from(&mut self, path: &Path) -> Result<()> {
        let snapshot = JsonSnapshotStore::new(path).load()?;
        self.restore(snapshot);
        Ok(())
    }

    fn restore(&mut self, snapshot: Snapshot) {
        info!(
            saved_at = %snapshot.saved_at,
            disks = snapshot.disks.len(),
            aliases = snapshot.aliases.len(),
            "inventory restored from snapshot"
        );
        let (topology, aliases) = snapshot.into_state();
        self.topology = topology;
        self.aliases = aliases;
    }

    // =========================================================================
    // Mangle
    // =========================================================================

    /// Rewrites `<device>` -> `<device>/<alias><slot>` for every disk of an
    /// aliased enclosure, longest device first
    pub fn mangle_rules(&self) -> Vec<(String, String)> {
        let device_dir = &self.config().device_dir;
        let mut rules: Vec<(String, String)> = self
            .aliases
            .iter()
            .flat_map(|(alias, enclosure)| {
                self.topology
                    .disks_in_enclosure(enclosure)
                    .into_iter()
                    .filter_map(move |disk| {
                        let short = disk.short_device(device_dir)?;
                        Some((
                            short.to_string(),
                            format!("{}/{}{:02}", short, alias, disk.slot),
                        ))
                    })
            })
            .collect();
        rules.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        rules
    }

    /// Apply the mangle rules to one line of text
    pub fn mangle_line(rules: &[(String, String)], line: &str) -> String {
        rules
            .iter()
            .fold(line.to_string(), |line, (from, to)| line.replace(from, to))
    }
}
