//! Topology Registry Module
//!
//! The in-memory entity graph produced by discovery and the operator's
//! enclosure alias table.

pub mod aliases;
pub mod topology;

pub use aliases::*;
pub use topology::*;
