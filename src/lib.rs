//! Ceph Disk Daemon - node-local disk and OSD topology
//!
//! Reconstructs, from `lsblk`, `udevadm`, `lvm` and `ceph-volume`, the
//! mapping between the block devices of a storage node, their LVM volumes
//! and the Ceph OSDs using them, and serves it on a loopback HTTP API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Disk Daemon                           │
//! │   ticker ──► check_disks ──► check_osds ──► ReportState      │
//! ├──────────────────────────────┬───────────────────────────────┤
//! │          Discovery           │           Topology            │
//! │  lsblk · udevadm · lvm ·     │  disk-to-osd index ·          │
//! │  ceph-volume                 │  OSD aggregation              │
//! ├──────────────────────────────┴───────────────────────────────┤
//! │     REST API  /apiCheck  /fullReport  /osdReport             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`discovery`]: host introspection through shell commands
//! - [`topology`]: pure correlation of the collected reports
//! - [`daemon`]: scheduler, change detection and published state
//! - [`api`]: local HTTP server and client
//! - [`domain`]: report model and the command runner port
//! - [`error`]: error types and handling

pub mod api;
pub mod daemon;
pub mod discovery;
pub mod domain;
pub mod error;
pub mod topology;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use api::{ApiServer, ReportClient, ReportKind, RestRouter};

pub use daemon::{DaemonConfig, DiskDaemon, ReportState, RuntimeData};

pub use discovery::{
    BlockDeviceCollector, CephVolumeCorrelator, LvmCacheActivator, ShellRunner, VolumesReport,
};

pub use domain::ports::{CommandOutput, CommandRunner};
pub use domain::report::{
    BlockDeviceInfo, DaemonReport, DaemonState, DeviceType, DisksReport, OsdDaemonInfo,
    OsdDevice, OsdPartition, OsdsReport, VolumeType,
};

pub use error::{Error, Result, ResultExt};

pub use topology::{OsdAggregation, OsdAggregator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
