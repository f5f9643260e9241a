//! Ceph-Volume Correlator
//!
//! Lists the volumes ceph-volume knows about on this node, grouped by OSD
//! id, with the tags that tie block and metadata volumes together.

use crate::domain::ports::CommandRunner;
use crate::domain::report::VolumeType;
use crate::error::{Error, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub const CEPH_VOLUME_COMMAND: &str = "ceph-volume lvm list --format json";

/// ceph-volume tags used for pairing and identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsdVolumeTags {
    #[serde(rename = "ceph.block_device")]
    pub block_device: String,
    #[serde(rename = "ceph.db_device")]
    pub db_device: String,
    #[serde(rename = "ceph.cluster_fsid")]
    pub cluster_fsid: String,
    #[serde(rename = "ceph.osd_fsid")]
    pub osd_fsid: String,
}

/// One volume of an OSD as listed by ceph-volume
///
/// Legacy physical metadata partitions carry neither `devices` nor
/// `lv_path` and have no `ceph.*` tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsdVolumeInfo {
    /// Physical devices the volume sits on
    pub devices: Vec<String>,
    pub lv_path: String,
    pub path: String,
    #[serde(rename = "type")]
    pub volume_type: VolumeType,
    pub tags: OsdVolumeTags,
}

impl OsdVolumeInfo {
    pub fn is_lvm(&self) -> bool {
        !self.lv_path.is_empty()
    }
}

/// OSD id to its volumes, in listing order
pub type VolumesReport = BTreeMap<String, Vec<OsdVolumeInfo>>;

/// Reads the OSD volume inventory from ceph-volume
#[derive(Clone)]
pub struct CephVolumeCorrelator {
    runner: Arc<dyn CommandRunner>,
}

impl CephVolumeCorrelator {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub async fn list(&self) -> Result<VolumesReport> {
        let output = self
            .runner
            .run(CEPH_VOLUME_COMMAND)
            .await
            .context("failed to list ceph volumes")?;

        let volumes: VolumesReport =
            serde_json::from_str(&output.stdout).map_err(|source| {
                Error::Parse {
                    what: "ceph-volume".into(),
                    source,
                }
                .context(format!(
                    "failed to parse output for command '{}'",
                    CEPH_VOLUME_COMMAND
                ))
            })?;

        debug!("ceph-volume reported {} OSDs", volumes.len());
        Ok(volumes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedRunner, CLUSTER_FSID, NODE1_CEPH_VOLUME, OSD30_BLOCK};

    async fn list_with(stdout: &str) -> Result<VolumesReport> {
        let runner = ScriptedRunner::new();
        runner.reply(CEPH_VOLUME_COMMAND, stdout);
        CephVolumeCorrelator::new(runner.into_shared()).list().await
    }

    #[tokio::test]
    async fn test_node1_listing() {
        let volumes = list_with(NODE1_CEPH_VOLUME).await.unwrap();
        assert_eq!(volumes.keys().collect::<Vec<_>>(), vec!["20", "25", "30"]);

        let osd30 = &volumes["30"];
        assert_eq!(osd30.len(), 2);
        assert_eq!(osd30[0].path, OSD30_BLOCK);
        assert_eq!(osd30[0].volume_type, VolumeType::Block);
        assert_eq!(osd30[0].devices, vec!["/dev/vdb"]);
        assert_eq!(osd30[0].tags.db_device, "/dev/vda14");
        assert_eq!(osd30[0].tags.cluster_fsid, CLUSTER_FSID);
        assert_eq!(osd30[0].tags.osd_fsid, "f4edb5cd-fb1e-4620-9419-3f9a4fcecba5");
        assert!(osd30[0].is_lvm());

        let legacy = &osd30[1];
        assert_eq!(legacy.path, "/dev/vda14");
        assert_eq!(legacy.volume_type, VolumeType::Db);
        assert!(legacy.devices.is_empty());
        assert!(!legacy.is_lvm());
        assert_eq!(legacy.tags, OsdVolumeTags::default());
    }

    #[tokio::test]
    async fn test_no_osds() {
        assert!(list_with("{}").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unparsable_output() {
        let err = list_with("Running command: ...").await.unwrap_err();
        assert!(err.to_string().starts_with(
            "failed to parse output for command 'ceph-volume lvm list --format json': unable to parse ceph-volume output"
        ));
    }

    #[tokio::test]
    async fn test_command_failure() {
        let runner = ScriptedRunner::new();
        runner.fail(CEPH_VOLUME_COMMAND, "exit status: 1");
        let err = CephVolumeCorrelator::new(runner.into_shared())
            .list()
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("failed to list ceph volumes: "));
    }
}
