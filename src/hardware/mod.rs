//! Hardware Module
//!
//! Discovery of controllers, enclosures and disks, the resulting topology
//! registry, target resolution and locate indicators.

pub mod discovery;
pub mod indicator;
pub mod registry;
pub mod resolver;

pub use discovery::*;
pub use indicator::*;
pub use registry::*;
pub use resolver::*;
