//! Report Model - the data published by the daemon
//!
//! Field names on the wire are consumed by the external controller and
//! must stay stable. All maps are ordered so a report serializes to the
//! same bytes for the same topology.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

fn is_false(value: &bool) -> bool {
    !*value
}

// =============================================================================
// Device and Volume Types
// =============================================================================

/// Block device type as reported by lsblk
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceType {
    Disk,
    Part,
    Lvm,
    Loop,
    /// Anything else lsblk reports (raid1, crypt, rom, mpath, ...)
    Other(String),
}

impl DeviceType {
    pub fn as_str(&self) -> &str {
        match self {
            DeviceType::Disk => "disk",
            DeviceType::Part => "part",
            DeviceType::Lvm => "lvm",
            DeviceType::Loop => "loop",
            DeviceType::Other(other) => other,
        }
    }
}

impl From<String> for DeviceType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "disk" => DeviceType::Disk,
            "part" => DeviceType::Part,
            "lvm" => DeviceType::Lvm,
            "loop" => DeviceType::Loop,
            _ => DeviceType::Other(value),
        }
    }
}

impl From<DeviceType> for String {
    fn from(value: DeviceType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a ceph-volume record within its OSD
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VolumeType {
    /// Primary data store
    Block,
    /// Metadata store
    Db,
    /// wal, data, journal or anything newer
    Other(String),
}

impl VolumeType {
    pub fn as_str(&self) -> &str {
        match self {
            VolumeType::Block => "block",
            VolumeType::Db => "db",
            VolumeType::Other(other) => other,
        }
    }

    fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl Default for VolumeType {
    fn default() -> Self {
        VolumeType::Other(String::new())
    }
}

impl From<String> for VolumeType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "block" => VolumeType::Block,
            "db" => VolumeType::Db,
            _ => VolumeType::Other(value),
        }
    }
}

impl From<VolumeType> for String {
    fn from(value: VolumeType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for VolumeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Disks Report
// =============================================================================

/// One block device of the node, keyed by canonical name in [`DisksReport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDeviceInfo {
    /// Kernel device name
    pub kname: String,
    /// Device serial number
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub serial: String,
    /// Device type
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    /// Rotational device
    #[serde(rename = "rota")]
    pub rotational: bool,
    /// major:minor device number
    #[serde(rename = "maj:min")]
    pub maj_min: String,
    /// Sorted udev symlinks (by-id, by-path, by-uuid, ...)
    #[serde(default)]
    pub symlinks: Vec<String>,
    /// Canonical names of the parents; empty for disks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent: Vec<String>,
    /// Canonical names of the children
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

impl BlockDeviceInfo {
    /// Check if this is a whole disk
    pub fn is_disk(&self) -> bool {
        self.device_type == DeviceType::Disk
    }
}

/// Block topology of the node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisksReport {
    /// Devices keyed by canonical name
    pub block_info: BTreeMap<String, BlockDeviceInfo>,
    /// Any known name of a device mapped to its canonical name
    pub aliases: BTreeMap<String, String>,
    /// Disk to the sorted ids of the OSDs placed on it
    #[serde(
        rename = "disk_to_osd_map",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub disk_to_osd: Option<BTreeMap<String, Vec<String>>>,
}

impl DisksReport {
    /// Canonical name for any alias of a device
    pub fn canonical(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    /// Device record for a canonical name
    pub fn device(&self, name: &str) -> Option<&BlockDeviceInfo> {
        self.block_info.get(name)
    }
}

// =============================================================================
// OSDs Report
// =============================================================================

/// Physical device backing one OSD partition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsdDevice {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Device serial number
    #[serde(skip_serializing_if = "String::is_empty")]
    pub device_id: String,
    #[serde(rename = "device_pathes", skip_serializing_if = "Vec::is_empty")]
    pub symlinks: Vec<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub rotational: bool,
    /// OSD partition placed on this device
    #[serde(rename = "partition", skip_serializing_if = "String::is_empty")]
    pub related_partition: String,
    /// Partition of the disk the OSD volume actually sits on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parted_by: Option<String>,
}

/// Logical or physical partition used by an OSD
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsdPartition {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub partition: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub partition_symlinks: Vec<String>,
    #[serde(rename = "type", skip_serializing_if = "VolumeType::is_empty")]
    pub volume_type: VolumeType,
    /// The partition path resolves on the node
    #[serde(skip_serializing_if = "is_false")]
    pub exists: bool,
    /// LVM volume; false marks a legacy physical partition
    #[serde(skip_serializing_if = "is_false")]
    pub lvm: bool,
}

impl OsdPartition {
    /// Placeholder for a partition known only from a pairing tag
    pub fn stub(partition: impl Into<String>, volume_type: VolumeType) -> Self {
        Self {
            partition: partition.into(),
            volume_type,
            ..Default::default()
        }
    }

    /// Legacy physical metadata partition
    pub fn is_legacy_db(&self) -> bool {
        !self.lvm && self.volume_type == VolumeType::Db
    }
}

/// Aggregated view of one OSD instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsdDaemonInfo {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub osd_uuid: String,
    /// Cluster FSID
    #[serde(rename = "osd_fsid", skip_serializing_if = "String::is_empty")]
    pub cluster_fsid: String,
    #[serde(rename = "osd_device", skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<OsdDevice>,
    #[serde(rename = "osd_partitions", skip_serializing_if = "Vec::is_empty")]
    pub partitions: Vec<OsdPartition>,
}

/// Per-OSD usage of the node's devices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsdsReport {
    /// Tolerated but notable conditions, sorted
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// OSD id to its aggregated instances
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub osds: BTreeMap<String, Vec<OsdDaemonInfo>>,
}

// =============================================================================
// Daemon Report
// =============================================================================

/// State of the published report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DaemonState {
    /// No cycle has completed yet
    #[default]
    #[serde(rename = "preparing")]
    InProgress,
    #[serde(rename = "ok")]
    Ok,
    #[serde(rename = "failed")]
    Failed,
}

impl fmt::Display for DaemonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonState::InProgress => write!(f, "preparing"),
            DaemonState::Ok => write!(f, "ok"),
            DaemonState::Failed => write!(f, "failed"),
        }
    }
}

/// Everything the daemon knows about the node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonReport {
    pub state: DaemonState,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disks_report: Option<DisksReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub osds_report: Option<OsdsReport>,
}

impl DaemonReport {
    /// The same report without the raw device topology
    pub fn osd_view(&self) -> DaemonReport {
        DaemonReport {
            state: self.state,
            issues: self.issues.clone(),
            disks_report: None,
            osds_report: self.osds_report.clone(),
        }
    }
}
