//! REST API Handlers
//!
//! Read-only endpoints over the published daemon report. Paths are part
//! of the contract with the external controller.

use crate::daemon::state::ReportState;
use crate::domain::report::DaemonReport;
use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::debug;

pub const API_CHECK_PATH: &str = "/apiCheck";
pub const FULL_REPORT_PATH: &str = "/fullReport";
pub const OSD_REPORT_PATH: &str = "/osdReport";

// =============================================================================
// REST Router
// =============================================================================

/// REST API router builder
pub struct RestRouter {
    report: Arc<ReportState>,
}

impl RestRouter {
    pub fn new(report: Arc<ReportState>) -> Self {
        Self { report }
    }

    /// Build the Axum router
    pub fn build(self) -> Router {
        let state = AppState {
            report: self.report,
        };

        Router::new()
            .route(API_CHECK_PATH, get(api_check))
            .route(FULL_REPORT_PATH, get(full_report))
            .route(OSD_REPORT_PATH, get(osd_report))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    report: Arc<ReportState>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Liveness probe
async fn api_check() -> Json<&'static str> {
    Json("ok")
}

async fn full_report(State(state): State<AppState>) -> Json<DaemonReport> {
    let report = state.report.snapshot();
    debug!("Serving full report in state {}", report.state);
    Json(report)
}

/// Report without the raw device topology
async fn osd_report(State(state): State<AppState>) -> Json<DaemonReport> {
    let report = state.report.osd_snapshot();
    debug!("Serving osd report in state {}", report.state);
    Json(report)
}
