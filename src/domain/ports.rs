//! Domain Ports - Boundaries between topology logic and the host
//!
//! These traits define how the discovery core reaches external tools,
//! the locate indicators and the snapshot storage. Adapters implement
//! them; tests substitute in-memory fakes.

use crate::error::Result;
use crate::snapshot::Snapshot;
use async_trait::async_trait;
use std::sync::Arc;

// =============================================================================
// Tool Runner Port
// =============================================================================

/// Runs an external tool and returns its standard output as text
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run `program` with `args` and return its sole text output
    async fn run(&self, program: &str, args: &[String]) -> Result<String>;
}

// =============================================================================
// Indicator Controller Port
// =============================================================================

/// Drives the locate indicator of a single slot
#[async_trait]
pub trait IndicatorController: Send + Sync {
    /// Turn the locate indicator at `controller`, `enclosure_index:slot` on or off
    async fn set_locate(
        &self,
        controller: u32,
        enclosure_index: u32,
        slot: u32,
        on: bool,
    ) -> Result<()>;
}

// =============================================================================
// Snapshot Store Port
// =============================================================================

/// Persists the whole topology and alias table as one unit
pub trait SnapshotStore: Send + Sync {
    /// Replace the persisted snapshot
    fn save(&self, snapshot: &Snapshot) -> Result<()>;

    /// Read the persisted snapshot
    fn load(&self) -> Result<Snapshot>;

    /// Human-readable location, used in logs
    fn location(&self) -> String;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type ToolRunnerRef = Arc<dyn ToolRunner>;
pub type SnapshotStoreRef = Arc<dyn SnapshotStore>;
