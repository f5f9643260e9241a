//! Domain layer - report model and port definitions
//!
//! The report types are the wire contract served by the local API; the
//! ports define the boundary to the host's introspection tools.

pub mod ports;
pub mod report;

pub use ports::*;
pub use report::*;
