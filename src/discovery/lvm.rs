//! LVM Cache Activator
//!
//! Logical volumes living on physical volumes that LVM inside the daemon's
//! container has not scanned yet are invisible to ceph-volume. Rescanning
//! those physical volumes makes them visible without touching their data.

use super::lsblk::DiscoveredLvms;
use crate::domain::ports::CommandRunner;
use crate::error::{Error, Result, ResultExt};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

// =============================================================================
// Constants
// =============================================================================

/// Active logical volumes as a JSON report of device-mapper paths
pub const ACTIVE_LVS_COMMAND: &str = "lvm lvs --reportformat json -o lv_dm_path";

/// Command line rescanning one physical volume into the LVM cache
pub fn pvscan_command(pv: &str) -> String {
    format!("pvscan --cache {}", pv)
}

// =============================================================================
// lvs Output
// =============================================================================

#[derive(Debug, Deserialize)]
struct LvsReport {
    #[serde(default)]
    report: Vec<LvsReportEntry>,
}

#[derive(Debug, Deserialize)]
struct LvsReportEntry {
    #[serde(default)]
    lv: Vec<LvsVolume>,
}

#[derive(Debug, Deserialize)]
struct LvsVolume {
    #[serde(default)]
    lv_dm_path: String,
}

// =============================================================================
// Activator
// =============================================================================

/// Makes discovered logical volumes visible to LVM tooling
#[derive(Clone)]
pub struct LvmCacheActivator {
    runner: Arc<dyn CommandRunner>,
}

impl LvmCacheActivator {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Device-mapper paths of the currently active logical volumes
    pub async fn active_lvs(&self) -> Result<BTreeSet<String>> {
        let output = self.runner.run(ACTIVE_LVS_COMMAND).await?;
        let report: LvsReport =
            serde_json::from_str(&output.stdout).map_err(|source| Error::Parse {
                what: "lvm lvs".into(),
                source,
            })?;

        Ok(report
            .report
            .into_iter()
            .flat_map(|entry| entry.lv)
            .map(|lv| lv.lv_dm_path)
            .filter(|path| !path.is_empty())
            .collect())
    }

    /// Rescan every physical volume backing a discovered but inactive LV
    ///
    /// Returns the physical volumes that were rescanned. Stops at the first
    /// failing rescan; rescanning is idempotent, so the next cycle retries.
    pub async fn activate(&self, discovered: &DiscoveredLvms) -> Result<Vec<String>> {
        let active = self.active_lvs().await?;

        let mut pending = BTreeSet::new();
        for (lv, pvs) in discovered {
            if active.contains(lv) {
                continue;
            }
            info!(
                "Found logical volume '{}' on disk(s) '{}', which is not cached in daemon container",
                lv,
                pvs.join(",")
            );
            pending.extend(pvs.iter().cloned());
        }

        if pending.is_empty() {
            debug!("All {} discovered logical volumes are active", discovered.len());
            return Ok(Vec::new());
        }

        for pv in &pending {
            info!("Caching physical volume {}", pv);
            self.runner
                .run(&pvscan_command(pv))
                .await
                .context("failed to cache volumes")?;
        }
        Ok(pending.into_iter().collect())
    }
}
