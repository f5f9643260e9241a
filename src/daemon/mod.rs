//! Disk daemon: configuration, state and the periodic reporter

pub mod config;
pub mod reporter;
pub mod state;

pub use config::{DaemonConfig, DEFAULT_CHECK_INTERVAL, DEFAULT_PORT};
pub use reporter::DiskDaemon;
pub use state::{ReportState, RuntimeData};
