//! Domain layer - Topology entities and port definitions
//!
//! This module defines the entities the discovery pipeline produces and
//! the traits (ports) that tool, indicator and snapshot adapters implement.

pub mod entities;
pub mod ports;

pub use entities::*;
pub use ports::*;
