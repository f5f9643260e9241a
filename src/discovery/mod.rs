//! Host introspection
//!
//! Each collector wraps one family of tools:
//! - `lsblk` for the block device tree
//! - `udevadm` for device symlinks
//! - `lvm`/`pvscan` for logical volume activation
//! - `ceph-volume` for OSD volumes

pub mod ceph_volume;
pub mod executor;
pub mod lsblk;
pub mod lvm;
pub mod udev;

pub use ceph_volume::{CephVolumeCorrelator, OsdVolumeInfo, OsdVolumeTags, VolumesReport};
pub use executor::ShellRunner;
pub use lsblk::{BlockCollection, BlockDeviceCollector, DiscoveredLvms};
pub use lvm::LvmCacheActivator;
pub use udev::AliasResolver;
