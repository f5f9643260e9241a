//! OSD Aggregator
//!
//! Folds the ceph-volume records of every OSD into deduplicated
//! [`OsdDaemonInfo`] entries, pairing block volumes with their metadata
//! volumes and attributing each volume to the disk it occupies.
//!
//! Pairing follows the cross references ceph-volume stores in LV tags: a
//! block volume names its metadata volume (`ceph.db_device`) and vice
//! versa (`ceph.block_device`). Whichever record comes first opens an
//! entry and leaves a stub partition for its partner; the partner later
//! finds the entry through the stub path and fills it in.
//!
//! Legacy physical metadata partitions have no tags at all, so they join
//! an entry on path alone, and an entry holding one accepts its block
//! volume without an identity match.

use super::disk_index::{dev_path, find_disk_name};
use crate::discovery::ceph_volume::{OsdVolumeInfo, OsdVolumeTags, VolumesReport};
use crate::domain::report::{
    DisksReport, OsdDaemonInfo, OsdDevice, OsdPartition, OsdsReport, VolumeType,
};
use crate::error::{Error, Result};
use std::collections::HashMap;
use tracing::{error, info, warn};

// =============================================================================
// Aggregation Result
// =============================================================================

/// Output of one aggregation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsdAggregation {
    /// Per-OSD entries and sorted warnings
    pub report: OsdsReport,
    /// Sorted problems that stopped aggregation of an OSD
    pub issues: Vec<String>,
}

// =============================================================================
// Aggregator
// =============================================================================

/// Correlates OSD volumes with the block topology of the node
pub struct OsdAggregator<'a> {
    disks: &'a DisksReport,
}

impl<'a> OsdAggregator<'a> {
    pub fn new(disks: &'a DisksReport) -> Self {
        Self { disks }
    }

    /// Aggregate every OSD of `volumes`
    pub fn aggregate(&self, volumes: &VolumesReport) -> OsdAggregation {
        info!("Preparing osd disk's usage report");

        let mut aggregation = OsdAggregation::default();
        for (osd, records) in volumes {
            let infos = self.aggregate_osd(
                osd,
                records,
                &mut aggregation.report.warnings,
                &mut aggregation.issues,
            );
            aggregation.report.osds.insert(osd.clone(), infos);
        }
        aggregation.report.warnings.sort();
        aggregation.issues.sort();

        info!(
            "Osd disk's usage report is prepared: {} osds, {} warnings, {} issues",
            aggregation.report.osds.len(),
            aggregation.report.warnings.len(),
            aggregation.issues.len()
        );
        aggregation
    }

    fn aggregate_osd(
        &self,
        osd: &str,
        records: &[OsdVolumeInfo],
        warnings: &mut Vec<String>,
        issues: &mut Vec<String>,
    ) -> Vec<OsdDaemonInfo> {
        let mut infos: Vec<OsdDaemonInfo> = Vec::new();
        let mut path_to_idx: HashMap<String, usize> = HashMap::new();

        for record in records {
            let device = match self.osd_device(osd, record) {
                Ok(device) => device,
                Err(issue) => {
                    error!("{}", issue);
                    issues.push(issue);
                    break;
                }
            };
            let partition = self.osd_partition(record);
            if !partition.lvm {
                let warning = format!(
                    "found physical osd {} partition '{}' for osd '{}'",
                    partition.volume_type, partition.partition, osd
                );
                warn!("{}", warning);
                warnings.push(warning);
            }

            let (existing, stub) = pair(record, &mut path_to_idx, infos.len());
            let tags = &record.tags;
            let current_legacy = partition.is_legacy_db()
                && (tags.osd_fsid.is_empty() || tags.cluster_fsid.is_empty());

            let target = existing.filter(|&idx| {
                let info = &infos[idx];
                let legacy_found = !current_legacy
                    && (info.osd_uuid.is_empty() || info.cluster_fsid.is_empty())
                    && info.partitions.iter().any(OsdPartition::is_legacy_db);
                (tags.osd_fsid == info.osd_uuid && tags.cluster_fsid == info.cluster_fsid)
                    || current_legacy
                    || legacy_found
            });

            match target {
                Some(idx) => merge(&mut infos[idx], device, partition, tags),
                None => {
                    let mut partitions = vec![partition];
                    if let Some(stub) = stub {
                        if stub.partition != partitions[0].partition {
                            partitions.push(stub);
                        }
                    }
                    path_to_idx.insert(record.path.clone(), infos.len());
                    infos.push(OsdDaemonInfo {
                        osd_uuid: tags.osd_fsid.clone(),
                        cluster_fsid: tags.cluster_fsid.clone(),
                        devices: vec![device],
                        partitions,
                    });
                }
            }
        }
        infos
    }

    /// Physical disk behind a record, or the issue preventing attribution
    fn osd_device(&self, osd: &str, record: &OsdVolumeInfo) -> std::result::Result<OsdDevice, String> {
        let partition_issue =
            |err: Error| format!("for osd '{}', partition '{}' {}", osd, record.path, err);

        let (name, parted_by) = match record.devices.as_slice() {
            [device] => self.backing_disk(device).map_err(partition_issue)?,
            [] if record.volume_type == VolumeType::Db => {
                let disk = find_disk_name(&record.path, self.disks).map_err(partition_issue)?;
                (disk, None)
            }
            [] => {
                return Err(format!(
                    "found physical osd {} partition '{}' for osd '{}', which is not supported",
                    record.volume_type, record.path, osd
                ))
            }
            _ => {
                return Err(format!(
                    "multidisk setup detected for osd '{}', partition '{}', which is not supported",
                    osd, record.path
                ))
            }
        };

        let mut device = OsdDevice {
            related_partition: record.path.clone(),
            parted_by,
            ..Default::default()
        };
        if let Some(info) = self.disks.device(&name) {
            device.device_id = info.serial.clone();
            device.symlinks = info.symlinks.clone();
            device.symlinks.sort();
            device.rotational = info.rotational;
        }
        device.name = name;
        Ok(device)
    }

    /// Disk owning `device`, plus the partition in between if any
    fn backing_disk(&self, device: &str) -> Result<(String, Option<String>)> {
        let path = dev_path(device);
        let canonical = self
            .disks
            .canonical(&path)
            .ok_or_else(|| Error::DeviceNotFound {
                device: path.clone(),
            })?;
        match self.disks.device(canonical) {
            Some(info) if info.is_disk() => Ok((canonical.to_string(), None)),
            _ => {
                let disk = find_disk_name(&path, self.disks)?;
                Ok((disk, Some(device.to_string())))
            }
        }
    }

    fn osd_partition(&self, record: &OsdVolumeInfo) -> OsdPartition {
        let canonical = self.disks.canonical(&record.path);

        let mut partition_symlinks = Vec::new();
        if let Some((block_name, info)) =
            canonical.and_then(|name| self.disks.device(name).map(|info| (name, info)))
        {
            if !info.is_disk() {
                partition_symlinks.extend(info.symlinks.iter().cloned());
                if block_name != record.path {
                    partition_symlinks.push(block_name.to_string());
                }
                if info.kname != block_name {
                    partition_symlinks.push(info.kname.clone());
                }
                partition_symlinks.sort();
            }
        }

        OsdPartition {
            partition: record.path.clone(),
            partition_symlinks,
            volume_type: record.volume_type.clone(),
            exists: canonical.is_some(),
            lvm: record.is_lvm(),
        }
    }
}

/// Look up the entry a record belongs to through its partner's path
///
/// When the partner has not been seen, its path is reserved for the entry
/// about to be opened at `next_idx` and a stub partition is returned.
fn pair(
    record: &OsdVolumeInfo,
    path_to_idx: &mut HashMap<String, usize>,
    next_idx: usize,
) -> (Option<usize>, Option<OsdPartition>) {
    let (partner, partner_type) = match record.volume_type {
        VolumeType::Block => (&record.tags.db_device, VolumeType::Db),
        VolumeType::Db => (&record.tags.block_device, VolumeType::Block),
        VolumeType::Other(_) => return (None, None),
    };

    if partner.is_empty() {
        return (path_to_idx.get(&record.path).copied(), None);
    }
    match path_to_idx.get(partner) {
        Some(&idx) => (Some(idx), None),
        None => {
            path_to_idx.insert(partner.clone(), next_idx);
            (None, Some(OsdPartition::stub(partner.clone(), partner_type)))
        }
    }
}

fn merge(info: &mut OsdDaemonInfo, device: OsdDevice, partition: OsdPartition, tags: &OsdVolumeTags) {
    match info
        .partitions
        .iter_mut()
        .find(|known| known.partition == partition.partition)
    {
        Some(slot) => *slot = partition,
        None => info.partitions.push(partition),
    }

    let duplicate = info.devices.iter().any(|known| {
        known.name == device.name && known.related_partition == device.related_partition
    });
    if !duplicate {
        info.devices.push(device);
    }

    if info.cluster_fsid.is_empty() {
        info.cluster_fsid = tags.cluster_fsid.clone();
    }
    if info.osd_uuid.is_empty() {
        info.osd_uuid = tags.osd_fsid.clone();
    }
}
