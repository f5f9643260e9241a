//! Daemon State
//!
//! Two kinds of state live here. [`ReportState`] is the published report,
//! shared with the HTTP handlers behind a reader/writer lock.
//! [`RuntimeData`] holds the caches used for change detection and is
//! owned by the reporter task alone.

use crate::discovery::ceph_volume::VolumesReport;
use crate::discovery::lsblk::DiscoveredLvms;
use crate::domain::report::{DaemonReport, DaemonState, DisksReport, OsdsReport};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, trace};

// =============================================================================
// Published Report
// =============================================================================

/// Lock-guarded report served by the API
#[derive(Debug, Default)]
pub struct ReportState {
    report: RwLock<DaemonReport>,
}

impl ReportState {
    /// Create a shared state holding an `InProgress` report
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Copy of the full report
    pub fn snapshot(&self) -> DaemonReport {
        self.report.read().clone()
    }

    /// Copy of the report without the device topology
    pub fn osd_snapshot(&self) -> DaemonReport {
        self.report.read().osd_view()
    }

    pub fn state(&self) -> DaemonState {
        self.report.read().state
    }

    /// Replace the published report
    ///
    /// Returns true when the new report differs from the previous one.
    pub fn publish(&self, report: DaemonReport) -> bool {
        let mut current = self.report.write();
        if *current == report {
            return false;
        }

        info!(
            "Daemon report changed: state {} -> {}, {} issues",
            current.state,
            report.state,
            report.issues.len()
        );
        trace!(old = ?*current, new = ?report, "Daemon report replaced");
        *current = report;
        true
    }
}

// =============================================================================
// Runtime Caches
// =============================================================================

/// Last known results of every pipeline step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeData {
    /// Logical volumes seen at the last activation
    pub known_lvms: Option<DiscoveredLvms>,
    pub disks: Option<DisksReport>,
    pub volumes: Option<VolumesReport>,
    pub osds: Option<OsdsReport>,
    /// Issues of the last aggregation
    pub osd_issues: Vec<String>,
}
