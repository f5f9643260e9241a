//! Topology correlation
//!
//! Everything here is pure: functions take the collected reports and
//! return derived views without touching the host.

pub mod aggregator;
pub mod disk_index;

pub use aggregator::{OsdAggregation, OsdAggregator};
pub use disk_index::{build_disk_to_osd, dev_path, find_disk_name, find_disks};
