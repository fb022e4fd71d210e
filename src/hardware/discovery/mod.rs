//! Hardware Discovery Module
//!
//! Extracts controllers, enclosures, disks, device paths and pool
//! membership from sas2ircu, prtconf and zpool output, and correlates
//! them into one topology.

pub mod builder;
pub mod correlator;
pub mod prtconf;
pub mod record;
pub mod runner;
pub mod sas2ircu;
pub mod zpool;

pub use builder::{SerialNormalizer, build_controller, build_disk, build_enclosure};
pub use correlator::{Correlator, DiscoveryReport, DiscoveryWarning};
pub use record::Record;
pub use runner::ProcessRunner;
