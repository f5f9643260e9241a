//! Alias Resolver
//!
//! Queries udev for the symlinks of a block device and derives the LVM
//! pretty path of device-mapper nodes.

use crate::domain::ports::CommandRunner;
use crate::error::Result;
use std::sync::Arc;
use tracing::debug;

/// Command line listing the udev symlinks of `device`
pub fn symlink_command(device: &str) -> String {
    format!("udevadm info -r --query=symlink {}", device)
}

/// `/dev/vg/lv` form of a `/dev/mapper/vg-lv` device name
///
/// Device-mapper escapes dashes inside VG and LV names by doubling them,
/// so `/dev/mapper/ceph--metadata-part--1` is `/dev/ceph-metadata/part-1`.
pub fn lvm_pretty_path(mapper_name: &str) -> Option<String> {
    if !mapper_name.contains("/mapper/") {
        return None;
    }
    let path = mapper_name
        .replace("/mapper/", "/")
        .replace('-', "/")
        .replace("//", "-");
    Some(path)
}

/// Resolves device symlinks through `udevadm`
#[derive(Clone)]
pub struct AliasResolver {
    runner: Arc<dyn CommandRunner>,
}

impl AliasResolver {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Sorted symlinks of `device`
    pub async fn symlinks(&self, device: &str) -> Result<Vec<String>> {
        let output = self.runner.run(&symlink_command(device)).await?;
        let mut symlinks: Vec<String> = output
            .stdout
            .split_whitespace()
            .map(str::to_string)
            .collect();
        symlinks.sort();
        debug!("Device {} has {} symlinks", device, symlinks.len());
        Ok(symlinks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    #[test]
    fn test_lvm_pretty_path() {
        assert_eq!(
            lvm_pretty_path("/dev/mapper/ceph--metadata-part--1").as_deref(),
            Some("/dev/ceph-metadata/part-1")
        );
        assert_eq!(
            lvm_pretty_path("/dev/mapper/vg_root-lv_root").as_deref(),
            Some("/dev/vg_root/lv_root")
        );
        assert_eq!(
            lvm_pretty_path(
                "/dev/mapper/ceph--992bbd78--3d8e--4cc3--93dc--eae387309364-osd--block--f4edb5cd--fb1e--4620--9419--3f9a4fcecba5"
            )
            .as_deref(),
            Some("/dev/ceph-992bbd78-3d8e-4cc3-93dc-eae387309364/osd-block-f4edb5cd-fb1e-4620-9419-3f9a4fcecba5")
        );
        assert_eq!(lvm_pretty_path("/dev/dm-0"), None);
    }

    #[tokio::test]
    async fn test_symlinks_sorted_and_trimmed() {
        let runner = ScriptedRunner::new();
        runner.reply(
            &symlink_command("/dev/vdd"),
            "/dev/disk/by-path/virtio-pci-0000:00:0e.0 /dev/disk/by-id/virtio-e8d89e2f-ffc6-4988-9 /dev/disk/by-path/pci-0000:00:0e.0\n",
        );
        let resolver = AliasResolver::new(runner.into_shared());

        let symlinks = resolver.symlinks("/dev/vdd").await.unwrap();
        assert_eq!(
            symlinks,
            vec![
                "/dev/disk/by-id/virtio-e8d89e2f-ffc6-4988-9",
                "/dev/disk/by-path/pci-0000:00:0e.0",
                "/dev/disk/by-path/virtio-pci-0000:00:0e.0",
            ]
        );
    }

    #[tokio::test]
    async fn test_no_symlinks() {
        let runner = ScriptedRunner::new();
        runner.reply(&symlink_command("/dev/vdz"), "\n");
        let resolver = AliasResolver::new(runner.into_shared());

        assert!(resolver.symlinks("/dev/vdz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_propagates() {
        let runner = ScriptedRunner::new();
        let resolver = AliasResolver::new(runner.into_shared());

        assert!(resolver.symlinks("/dev/vdz").await.is_err());
    }
}
