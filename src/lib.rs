//! diskmap - Storage Topology Discovery
//!
//! Builds one view of a host's storage: controllers, the enclosures wired
//! to them, the disks in their slots, and the pools those disks belong to.
//! The view joins the output of `sas2ircu`, `prtconf -v` and `zpool status`,
//! and operators address disks by serial, device, slot coordinates or
//! enclosure alias to drive the slot locate indicators.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            Inventory                             │
//! │         live Topology + AliasTable, snapshot after changes       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────────┐  │
//! │  │  Correlator  │──▶│   Topology   │◀──│  Resolver / Glyphs   │  │
//! │  │ (4 stages)   │   │ serial+device│   │                      │  │
//! │  └──────┬───────┘   └──────────────┘   └──────────┬───────────┘  │
//! │         │                                         │              │
//! │  ┌──────┴───────┐                      ┌──────────┴───────────┐  │
//! │  │  Extractors  │                      │ Indicator application│  │
//! │  │ sas2ircu /   │                      │  (locate LEDs)       │  │
//! │  │ prtconf/zpool│                      └──────────────────────┘  │
//! │  └──────────────┘                                                │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  Ports: ToolRunner · IndicatorController · SnapshotStore         │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`hardware`]: Discovery, topology registry, resolution and indicators
//! - [`inventory`]: Live state and persistence
//! - [`snapshot`]: Snapshot format and JSON store
//! - [`listing`]: Operator listings
//! - [`config`]: Configuration
//! - [`domain`]: Core entities and ports
//! - [`error`]: Error types and handling

pub mod config;
pub mod domain;
pub mod error;
pub mod hardware;
pub mod inventory;
pub mod listing;
pub mod snapshot;

// Re-export commonly used types
pub use config::{DiskmapConfig, SerialRule, ToolPaths};

pub use domain::entities::{Controller, Disk, Enclosure, SlotAddress};

pub use domain::ports::{
    IndicatorController, SnapshotStore, SnapshotStoreRef, ToolRunner, ToolRunnerRef,
};

pub use error::{Error, Result};

pub use hardware::{
    apply_indicator, draw_glyph, AliasTable, Correlator, DiscoveryReport, DiscoveryWarning,
    DiskId, Glyph, IndicatorReport, ProcessRunner, Resolver, Sas2IrcuIndicator, Topology,
};

pub use inventory::Inventory;

pub use snapshot::{JsonSnapshotStore, Snapshot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
