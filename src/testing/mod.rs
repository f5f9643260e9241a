//! Test support: a scripted command runner and the "node-1" fixtures
//!
//! Node-1 has seven disks. OSD 20 and 25 keep their block volumes on
//! `/dev/vde` and `/dev/vdf` and their metadata volumes on LVs carved from
//! `/dev/vdd1`. OSD 30 has its block volume on `/dev/vdb` and a legacy
//! physical metadata partition `/dev/vda14`. `/dev/md127` is a RAID over
//! `/dev/vda15` and `/dev/vdh1` carrying the root volume group.

use crate::discovery::ceph_volume::{VolumesReport, CEPH_VOLUME_COMMAND};
use crate::discovery::lsblk::{BlockDeviceCollector, LSBLK_COMMAND};
use crate::discovery::lvm::ACTIVE_LVS_COMMAND;
use crate::discovery::udev::symlink_command;
use crate::domain::ports::{CommandOutput, CommandRunner};
use crate::domain::report::DisksReport;
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub const NODE1_LSBLK: &str = include_str!("fixtures/node1_lsblk.json");
pub const NODE1_UDEVADM: &str = include_str!("fixtures/node1_udevadm.json");
pub const NODE1_LVS: &str = include_str!("fixtures/node1_lvs.json");
pub const NODE1_CEPH_VOLUME: &str = include_str!("fixtures/node1_ceph_volume.json");

pub const OSD20_BLOCK: &str =
    "/dev/ceph-21312wds-sdfv-vs3f-scv3-sdfdsg23edaa/osd-block-vbsgs3a3-sdcv-casq-sd11-asd12dasczsf";
pub const OSD25_BLOCK: &str =
    "/dev/ceph-2efce189-afb7-452f-bd32-c73b5017a0da/osd-block-d49fd9bf-d2dd-4c3d-824d-87f3f17ea44a";
pub const OSD30_BLOCK: &str =
    "/dev/ceph-992bbd78-3d8e-4cc3-93dc-eae387309364/osd-block-f4edb5cd-fb1e-4620-9419-3f9a4fcecba5";
pub const CLUSTER_FSID: &str = "8668f062-3faa-358a-85f3-f80fe6c1e306";

#[derive(Debug, Clone)]
enum Reply {
    Output(String),
    Failure(String),
}

/// [`CommandRunner`] answering from a table of exact command lines
///
/// Unscripted commands fail. Every call is recorded.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner answering every command the daemon issues on node-1
    pub fn node1() -> Self {
        let runner = Self::new();
        runner.reply(LSBLK_COMMAND, NODE1_LSBLK);
        runner.reply(ACTIVE_LVS_COMMAND, NODE1_LVS);
        runner.reply(CEPH_VOLUME_COMMAND, NODE1_CEPH_VOLUME);
        for (device, symlinks) in node1_symlinks() {
            runner.reply(&symlink_command(&device), &format!("{}\n", symlinks));
        }
        runner
    }

    pub fn reply(&self, command: &str, stdout: &str) {
        self.replies
            .lock()
            .insert(command.to_string(), Reply::Output(stdout.to_string()));
    }

    pub fn fail(&self, command: &str, reason: &str) {
        self.replies
            .lock()
            .insert(command.to_string(), Reply::Failure(reason.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &str) -> Result<CommandOutput> {
        self.calls.lock().push(command.to_string());
        let reply = self.replies.lock().get(command).cloned();
        match reply {
            Some(Reply::Output(stdout)) => Ok(CommandOutput::stdout(stdout)),
            Some(Reply::Failure(reason)) => Err(Error::CommandFailed {
                command: command.to_string(),
                reason,
            }),
            None => Err(Error::CommandFailed {
                command: command.to_string(),
                reason: "unexpected command".to_string(),
            }),
        }
    }
}

/// Device name to the space separated udev symlinks of node-1
pub fn node1_symlinks() -> BTreeMap<String, String> {
    serde_json::from_str(NODE1_UDEVADM).expect("valid udevadm fixture")
}

/// Block topology of node-1 as the collector builds it
pub async fn node1_disks() -> DisksReport {
    BlockDeviceCollector::new(ScriptedRunner::node1().into_shared())
        .collect()
        .await
        .expect("node-1 topology collects")
        .disks
}

/// ceph-volume inventory of node-1
pub fn node1_volumes() -> VolumesReport {
    serde_json::from_str(NODE1_CEPH_VOLUME).expect("valid ceph-volume fixture")
}
