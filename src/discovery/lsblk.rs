//! Block-Device Collector
//!
//! Flattens the device tree reported by `lsblk` into the node's
//! [`DisksReport`] registry and alias table, and records which
//! logical volumes exist and which physical volumes back them.

use super::udev::{lvm_pretty_path, AliasResolver};
use crate::domain::ports::CommandRunner;
use crate::domain::report::{BlockDeviceInfo, DeviceType, DisksReport};
use crate::error::{Error, Result, ResultExt};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

// =============================================================================
// Constants
// =============================================================================

/// JSON output, full device paths, all columns
pub const LSBLK_COMMAND: &str = "lsblk -J -p -O";

// =============================================================================
// lsblk Output
// =============================================================================

/// Top level of `lsblk -J` output
#[derive(Debug, Clone, Deserialize)]
pub struct LsblkReport {
    #[serde(rename = "blockdevices", default)]
    pub block_devices: Vec<LsblkDevice>,
}

/// One node of the lsblk device tree
#[derive(Debug, Clone, Deserialize)]
pub struct LsblkDevice {
    pub name: String,
    pub kname: String,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(rename = "maj:min", default)]
    pub maj_min: String,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub rota: bool,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    #[serde(default)]
    pub pkname: Option<String>,
    #[serde(default)]
    pub children: Vec<LsblkDevice>,
}

impl LsblkDevice {
    fn parent(&self) -> Option<&str> {
        self.pkname.as_deref().filter(|p| !p.is_empty())
    }
}

/// Older util-linux releases print flags as "0"/"1" strings
fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
        Number(u8),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(value)) => value,
        Some(Flag::Text(text)) => text == "1" || text.eq_ignore_ascii_case("true"),
        Some(Flag::Number(number)) => number != 0,
        None => false,
    })
}

// =============================================================================
// Collector
// =============================================================================

/// Logical volume name to the physical volumes it sits on
pub type DiscoveredLvms = BTreeMap<String, Vec<String>>;

/// Result of one block topology scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockCollection {
    /// Registry and aliases; `disk_to_osd` is left unset
    pub disks: DisksReport,
    pub lvms: DiscoveredLvms,
}

/// Builds the block topology of the node
#[derive(Clone)]
pub struct BlockDeviceCollector {
    runner: Arc<dyn CommandRunner>,
    resolver: AliasResolver,
}

impl BlockDeviceCollector {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let resolver = AliasResolver::new(runner.clone());
        Self { runner, resolver }
    }

    /// Run lsblk and parse its device tree
    pub async fn list(&self) -> Result<LsblkReport> {
        let output = self.runner.run(LSBLK_COMMAND).await?;
        serde_json::from_str(&output.stdout).map_err(|source| Error::Parse {
            what: "lsblk".into(),
            source,
        })
    }

    /// Scan the node's block devices
    pub async fn collect(&self) -> Result<BlockCollection> {
        let report = self.list().await.context("failed to get lsblk info")?;
        if report.block_devices.is_empty() {
            return Err(Error::EmptyTopology);
        }

        let mut ordered = Vec::new();
        children_first(&report.block_devices, &mut ordered);
        debug!("lsblk reported {} non-loop device entries", ordered.len());

        let mut collection = BlockCollection::default();
        for device in ordered {
            let symlinks = self
                .resolver
                .symlinks(&device.name)
                .await
                .with_context(|| format!("failed to get udevadm info for device '{}'", device.name))
                .context("failed to prepare block info")?;
            register(&mut collection, device, symlinks);
        }

        info!(
            "Collected {} block devices, {} aliases, {} logical volumes",
            collection.disks.block_info.len(),
            collection.disks.aliases.len(),
            collection.lvms.len()
        );
        Ok(collection)
    }
}

/// Depth-first order with every device after its descendants, loops skipped
fn children_first<'a>(devices: &'a [LsblkDevice], ordered: &mut Vec<&'a LsblkDevice>) {
    for device in devices {
        if device.device_type == DeviceType::Loop {
            continue;
        }
        children_first(&device.children, ordered);
        ordered.push(device);
    }
}

fn register(collection: &mut BlockCollection, device: &LsblkDevice, symlinks: Vec<String>) {
    let name = &device.name;
    let aliases = &mut collection.disks.aliases;

    for symlink in &symlinks {
        aliases.insert(symlink.clone(), name.clone());
    }
    aliases.insert(device.kname.clone(), name.clone());
    aliases.insert(name.clone(), name.clone());

    if device.device_type == DeviceType::Lvm {
        if let Some(pretty) = lvm_pretty_path(name) {
            aliases.insert(pretty, name.clone());
        }
        let pvs = collection.lvms.entry(name.clone()).or_default();
        if let Some(pv) = device.parent() {
            if !pvs.iter().any(|known| known == pv) {
                pvs.push(pv.to_string());
            }
        }
    }

    match collection.disks.block_info.get_mut(name) {
        // Same device reached through another parent (RAID member, multi-PV LV)
        Some(existing) => {
            if let Some(parent) = device.parent() {
                if !existing.parent.iter().any(|known| known == parent) {
                    existing.parent.push(parent.to_string());
                }
            }
        }
        None => {
            let info = BlockDeviceInfo {
                kname: device.kname.clone(),
                serial: device.serial.clone().unwrap_or_default(),
                device_type: device.device_type.clone(),
                rotational: device.rota,
                maj_min: device.maj_min.clone(),
                symlinks,
                parent: device.parent().map(str::to_string).into_iter().collect(),
                children: device
                    .children
                    .iter()
                    .filter(|child| child.device_type != DeviceType::Loop)
                    .map(|child| child.name.clone())
                    .collect(),
            };
            collection.disks.block_info.insert(name.clone(), info);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::udev::symlink_command;
    use crate::testing::{node1_symlinks, ScriptedRunner};
    use assert_matches::assert_matches;

    const RAID_ROOT: &str = "/dev/mapper/vg_root-lv_root";

    async fn collect_node1() -> BlockCollection {
        let collector = BlockDeviceCollector::new(ScriptedRunner::node1().into_shared());
        collector.collect().await.unwrap()
    }

    #[tokio::test]
    async fn test_node1_registry() {
        let collection = collect_node1().await;
        let block_info = &collection.disks.block_info;

        assert_eq!(block_info.len(), 19);
        assert!(block_info.keys().all(|name| !name.starts_with("/dev/loop")));

        let vda = &block_info["/dev/vda"];
        assert!(vda.is_disk());
        assert!(vda.parent.is_empty());
        assert_eq!(vda.serial, "8dad5ae9-ddf7-40bf-8");
        assert_eq!(vda.children, vec!["/dev/vda1", "/dev/vda14", "/dev/vda15"]);
        assert_eq!(
            vda.symlinks,
            vec![
                "/dev/disk/by-id/virtio-8dad5ae9-ddf7-40bf-8",
                "/dev/disk/by-path/pci-0000:00:09.0",
                "/dev/disk/by-path/virtio-pci-0000:00:09.0",
            ]
        );

        let vdc = &block_info["/dev/vdc"];
        assert!(vdc.serial.is_empty());
        assert!(vdc.children.is_empty());

        let part = &block_info["/dev/mapper/ceph--metadata-part--1"];
        assert_eq!(part.kname, "/dev/dm-2");
        assert_eq!(part.device_type, DeviceType::Lvm);
        assert_eq!(part.parent, vec!["/dev/vdd1"]);
        assert_eq!(part.maj_min, "253:2");
    }

    #[tokio::test]
    async fn test_multi_parent_device_merged() {
        let collection = collect_node1().await;
        let md = &collection.disks.block_info["/dev/md127"];

        assert_eq!(md.parent, vec!["/dev/vda15", "/dev/vdh1"]);
        assert_eq!(md.children, vec![RAID_ROOT]);
        assert_eq!(collection.disks.block_info[RAID_ROOT].parent, vec!["/dev/md127"]);
    }

    #[tokio::test]
    async fn test_alias_symmetry() {
        let collection = collect_node1().await;
        let disks = &collection.disks;

        for name in disks.block_info.keys() {
            assert_eq!(disks.canonical(name), Some(name.as_str()));
        }
        for (device, symlinks) in node1_symlinks() {
            for symlink in symlinks.split_whitespace() {
                assert_eq!(disks.canonical(symlink), Some(device.as_str()));
            }
        }
        for canonical in disks.aliases.values() {
            assert!(disks.block_info.contains_key(canonical));
        }
    }

    #[tokio::test]
    async fn test_kernel_and_pretty_aliases() {
        let collection = collect_node1().await;
        let disks = &collection.disks;

        assert_eq!(disks.canonical("/dev/dm-0"), Some(RAID_ROOT));
        assert_eq!(disks.canonical("/dev/vg_root/lv_root"), Some(RAID_ROOT));
        assert_eq!(
            disks.canonical("/dev/ceph-metadata/part-2"),
            Some("/dev/mapper/ceph--metadata-part--2")
        );
        assert_eq!(disks.canonical("/dev/md/md_root"), Some("/dev/md127"));
        assert_eq!(disks.aliases.len(), 95);
    }

    #[tokio::test]
    async fn test_discovered_lvms() {
        let collection = collect_node1().await;
        let lvms = &collection.lvms;

        assert_eq!(lvms.len(), 6);
        assert_eq!(lvms[RAID_ROOT], vec!["/dev/md127"]);
        assert_eq!(lvms["/dev/mapper/ceph--metadata-part--1"], vec!["/dev/vdd1"]);
        assert_eq!(lvms["/dev/mapper/ceph--metadata-part--2"], vec!["/dev/vdd1"]);
    }

    #[tokio::test]
    async fn test_children_visited_before_parents() {
        let runner = ScriptedRunner::node1();
        let runner = runner.into_shared();
        BlockDeviceCollector::new(runner.clone()).collect().await.unwrap();

        let udev_calls = runner.calls_starting_with("udevadm");
        let position = |device: &str| {
            udev_calls
                .iter()
                .position(|call| call == &symlink_command(device))
                .unwrap()
        };
        assert!(position("/dev/vdd1") < position("/dev/vdd"));
        assert!(position("/dev/mapper/ceph--metadata-part--1") < position("/dev/vdd1"));
        assert!(position("/dev/md127") < position("/dev/vda15"));
        assert!(udev_calls.iter().all(|call| !call.contains("loop")));
    }

    #[tokio::test]
    async fn test_empty_topology() {
        let runner = ScriptedRunner::new();
        runner.reply(LSBLK_COMMAND, r#"{"blockdevices": []}"#);
        let err = BlockDeviceCollector::new(runner.into_shared())
            .collect()
            .await
            .unwrap_err();

        assert_matches!(err, Error::EmptyTopology);
        assert_eq!(err.to_string(), "no blockdevices found for 'lsblk' output");
    }

    #[tokio::test]
    async fn test_lsblk_failures() {
        let runner = ScriptedRunner::new();
        runner.fail(LSBLK_COMMAND, "exit status: 32");
        let err = BlockDeviceCollector::new(runner.into_shared())
            .collect()
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to get lsblk info: command 'lsblk -J -p -O' failed: exit status: 32"
        );

        let runner = ScriptedRunner::new();
        runner.reply(LSBLK_COMMAND, "not json");
        let err = BlockDeviceCollector::new(runner.into_shared())
            .collect()
            .await
            .unwrap_err();
        assert_matches!(err.root(), Error::Parse { .. });
        assert!(err
            .to_string()
            .starts_with("failed to get lsblk info: unable to parse lsblk output"));
    }

    #[tokio::test]
    async fn test_single_udevadm_failure_aborts() {
        let runner = ScriptedRunner::node1();
        runner.fail(&symlink_command("/dev/vda1"), "exit status: 1");
        let err = BlockDeviceCollector::new(runner.into_shared())
            .collect()
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with(
            "failed to prepare block info: failed to get udevadm info for device '/dev/vda1'"
        ));
    }

    #[test]
    fn test_rota_accepts_string_flags() {
        let report: LsblkReport = serde_json::from_str(
            r#"{"blockdevices": [
                {"name": "/dev/sda", "kname": "/dev/sda", "maj:min": "8:0", "rota": "1", "type": "disk"},
                {"name": "/dev/sdb", "kname": "/dev/sdb", "maj:min": "8:16", "rota": "0", "type": "disk"},
                {"name": "/dev/sdc", "kname": "/dev/sdc", "maj:min": "8:32", "rota": null, "type": "disk"}
            ]}"#,
        )
        .unwrap();

        assert!(report.block_devices[0].rota);
        assert!(!report.block_devices[1].rota);
        assert!(!report.block_devices[2].rota);
    }
}
