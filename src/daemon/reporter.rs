//! Disk Daemon Reporter
//!
//! Runs the discovery pipeline once per tick:
//!
//! ```text
//! lsblk + udevadm ──► LVM activation (LV set changed) ──► ceph-volume
//!        │                                                   │
//!        └──────────────► disk-to-osd index ◄────────────────┘
//!                                │
//!               OSD aggregation (topology or volumes changed)
//!                                │
//!                         published report
//! ```
//!
//! A failing step marks the report failed and leaves the runtime caches
//! untouched, so the next tick retries from the last good state.

use super::config::DaemonConfig;
use super::state::{ReportState, RuntimeData};
use crate::api::server::ApiServer;
use crate::discovery::ceph_volume::CephVolumeCorrelator;
use crate::discovery::lsblk::BlockDeviceCollector;
use crate::discovery::lvm::LvmCacheActivator;
use crate::domain::ports::CommandRunner;
use crate::domain::report::{DaemonReport, DaemonState, DisksReport};
use crate::error::{Error, Result, ResultExt};
use crate::topology::aggregator::OsdAggregator;
use crate::topology::disk_index::build_disk_to_osd;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

/// Periodically rebuilds and publishes the node's disk report
pub struct DiskDaemon {
    config: DaemonConfig,
    collector: BlockDeviceCollector,
    activator: LvmCacheActivator,
    correlator: CephVolumeCorrelator,
    report: Arc<ReportState>,
    runtime: RuntimeData,
}

impl DiskDaemon {
    pub fn new(config: DaemonConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            config,
            collector: BlockDeviceCollector::new(runner.clone()),
            activator: LvmCacheActivator::new(runner.clone()),
            correlator: CephVolumeCorrelator::new(runner),
            report: ReportState::new(),
            runtime: RuntimeData::default(),
        }
    }

    /// Handle on the published report
    pub fn report_state(&self) -> Arc<ReportState> {
        self.report.clone()
    }

    pub fn runtime(&self) -> &RuntimeData {
        &self.runtime
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    /// Refresh the block topology and volume listing
    ///
    /// Returns true when either differs from the cached one. Nothing is
    /// cached unless every step succeeds.
    pub async fn check_disks(&mut self) -> Result<bool> {
        let collection = self
            .collector
            .collect()
            .await
            .context("daemon failed to prepare block device report")?;

        let topology_changed = match &self.runtime.disks {
            Some(known) => {
                known.block_info != collection.disks.block_info
                    || known.aliases != collection.disks.aliases
            }
            None => true,
        };
        let lvms_changed = self.runtime.known_lvms.as_ref() != Some(&collection.lvms);
        if topology_changed && lvms_changed {
            let cached = self
                .activator
                .activate(&collection.lvms)
                .await
                .context("daemon failed to check cached logical volumes")?;
            if !cached.is_empty() {
                info!("Cached physical volumes: {}", cached.join(","));
            }
        }

        let volumes = self
            .correlator
            .list()
            .await
            .context("daemon failed to prepare ceph volumes info report")?;
        let volumes_changed = self.runtime.volumes.as_ref() != Some(&volumes);

        if topology_changed {
            info!("Block device topology changed");
            trace!(old = ?self.runtime.disks, new = ?collection.disks, "Block device topology");
            let disk_to_osd = self
                .runtime
                .disks
                .take()
                .and_then(|known| known.disk_to_osd);
            self.runtime.disks = Some(DisksReport {
                disk_to_osd,
                ..collection.disks
            });
            if lvms_changed {
                self.runtime.known_lvms = Some(collection.lvms);
            }
        }
        if volumes_changed {
            info!("Ceph volumes changed: {} osds listed", volumes.len());
            trace!(old = ?self.runtime.volumes, new = ?volumes, "Ceph volumes");
            self.runtime.volumes = Some(volumes);
        }

        let changed = topology_changed || volumes_changed;
        if changed {
            if let (Some(disks), Some(volumes)) =
                (self.runtime.disks.as_mut(), self.runtime.volumes.as_ref())
            {
                let disk_to_osd = build_disk_to_osd(volumes, disks);
                disks.disk_to_osd = disk_to_osd;
            }
        } else {
            debug!("No changes in block devices or ceph volumes");
        }
        Ok(changed)
    }

    /// Re-aggregate OSDs from the cached topology and volumes
    pub fn check_osds(&mut self) {
        let (Some(disks), Some(volumes)) = (&self.runtime.disks, &self.runtime.volumes) else {
            return;
        };
        let aggregation = OsdAggregator::new(disks).aggregate(volumes);
        trace!(old = ?self.runtime.osds, new = ?aggregation.report, "Osd report");

        self.runtime.osds = Some(aggregation.report);
        self.runtime.osd_issues = aggregation.issues;
    }

    /// Run one pipeline pass and publish its result
    pub async fn prepare_report(&mut self) {
        let report = match self.check_disks().await {
            Ok(changed) => {
                if changed {
                    self.check_osds();
                }
                let state = if self.runtime.osd_issues.is_empty() {
                    DaemonState::Ok
                } else {
                    DaemonState::Failed
                };
                DaemonReport {
                    state,
                    issues: self.runtime.osd_issues.clone(),
                    disks_report: self.runtime.disks.clone(),
                    osds_report: self.runtime.osds.clone(),
                }
            }
            Err(err) => {
                error!("{}", err);
                DaemonReport {
                    state: DaemonState::Failed,
                    issues: vec![err.to_string()],
                    disks_report: None,
                    osds_report: None,
                }
            }
        };
        self.report.publish(report);
    }

    // =========================================================================
    // Scheduler
    // =========================================================================

    /// Serve the report API and refresh the report every check interval
    ///
    /// Returns when `token` is cancelled, either by the caller or by a
    /// failing listener, whose error is then returned.
    pub async fn run(mut self, token: CancellationToken) -> Result<()> {
        self.config.validate()?;

        let server = ApiServer::new(self.config.socket_addr(), self.report.clone());
        let listener = server.bind().await?;
        let server_handle = tokio::spawn(server.serve(listener, token.clone()));

        info!(
            "Disk daemon started, checking disks every {:?}",
            self.config.check_interval
        );
        let mut ticker = tokio::time::interval(self.config.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => self.prepare_report().await,
            }
        }
        info!("Disk daemon stopped");

        match server_handle.await {
            Ok(result) => result,
            Err(e) => Err(Error::Api(format!("REST server task failed: {}", e))),
        }
    }
}
