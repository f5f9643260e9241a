//! Disk-to-OSD Index Builder
//!
//! Walks the parent graph of the block registry upward from OSD volumes
//! to the whole disks they occupy.

use crate::discovery::ceph_volume::VolumesReport;
use crate::domain::report::DisksReport;
use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::warn;

/// Prefix `name` with `/dev/` unless it already has it
pub fn dev_path(name: &str) -> String {
    if name.starts_with("/dev/") {
        name.to_string()
    } else {
        format!("/dev/{}", name)
    }
}

/// Resolve any device name to the single disk it lives on
///
/// Fails with [`Error::MultiDisk`] when the chain branches over several
/// parents and with [`Error::DeviceNotFound`] for unknown names.
pub fn find_disk_name(name: &str, disks: &DisksReport) -> Result<String> {
    let mut visited = HashSet::new();
    ascend_single(&dev_path(name), disks, &mut visited)
}

fn ascend_single(name: &str, disks: &DisksReport, visited: &mut HashSet<String>) -> Result<String> {
    let device = disks
        .canonical(name)
        .and_then(|canonical| disks.device(canonical).map(|info| (canonical, info)));
    let Some((canonical, info)) = device else {
        return Err(Error::DeviceNotFound {
            device: name.to_string(),
        });
    };
    if !visited.insert(canonical.to_string()) {
        return Err(Error::TopologyCycle {
            device: canonical.to_string(),
        });
    }
    if info.is_disk() {
        return Ok(canonical.to_string());
    }
    match info.parent.as_slice() {
        [parent] => ascend_single(parent, disks, visited),
        [] => Err(Error::DeviceNotFound {
            device: name.to_string(),
        }),
        parents => Err(Error::MultiDisk {
            parents: parents.to_vec(),
        }),
    }
}

/// Every disk under the canonical device `name`, following all parents
pub fn find_disks(name: &str, disks: &DisksReport) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    let mut visited = HashSet::new();
    ascend_all(name, disks, &mut visited, &mut found);
    found
}

fn ascend_all(
    name: &str,
    disks: &DisksReport,
    visited: &mut HashSet<String>,
    found: &mut BTreeSet<String>,
) {
    if !visited.insert(name.to_string()) {
        return;
    }
    let Some(info) = disks.device(name) else {
        warn!("'{}' is not present in block info", name);
        return;
    };
    if info.is_disk() {
        found.insert(name.to_string());
        return;
    }
    if info.parent.is_empty() {
        warn!("'{}' type of '{}' has no parent", name, info.device_type);
        return;
    }
    for parent in &info.parent {
        ascend_all(parent, disks, visited, found);
    }
}

/// Disk to the sorted ids of the OSDs with a volume on it
///
/// `None` when no OSD volumes are known.
pub fn build_disk_to_osd(
    volumes: &VolumesReport,
    disks: &DisksReport,
) -> Option<BTreeMap<String, Vec<String>>> {
    if volumes.is_empty() {
        return None;
    }

    let mut index: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (osd_id, records) in volumes {
        for record in records {
            let referenced: Vec<&String> = if record.devices.is_empty() {
                vec![&record.path]
            } else {
                record.devices.iter().collect()
            };
            for path in referenced {
                let Some(canonical) = disks.canonical(path) else {
                    warn!("device '{}' of osd '{}' is not found on a node", path, osd_id);
                    continue;
                };
                for disk in find_disks(canonical, disks) {
                    index.entry(disk).or_default().insert(osd_id.clone());
                }
            }
        }
    }

    Some(
        index
            .into_iter()
            .map(|(disk, ids)| (disk, ids.into_iter().collect()))
            .collect(),
    )
}
