//! Report API Server
//!
//! Owns the listener lifecycle. Binding happens before the daemon starts
//! its loop so a taken port fails startup right away.

use super::rest::RestRouter;
use crate::daemon::state::ReportState;
use crate::error::{Error, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Local HTTP server exposing the daemon report
pub struct ApiServer {
    addr: SocketAddr,
    report: Arc<ReportState>,
}

impl ApiServer {
    pub fn new(addr: SocketAddr, report: Arc<ReportState>) -> Self {
        Self { addr, report }
    }

    /// Bind the listening socket
    pub async fn bind(&self) -> Result<TcpListener> {
        let listener = TcpListener::bind(self.addr).await.map_err(|e| {
            Error::Api(format!("failed to bind REST server on {}: {}", self.addr, e))
        })?;
        info!("REST API listening on {}", listener.local_addr()?);
        Ok(listener)
    }

    /// Serve until `token` is cancelled
    ///
    /// A listener failure cancels `token` so the daemon loop stops too.
    pub async fn serve(self, listener: TcpListener, token: CancellationToken) -> Result<()> {
        let app = RestRouter::new(self.report).build();

        let shutdown = token.clone();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                info!("REST server shutting down");
            })
            .await;

        if let Err(e) = result {
            error!("REST server error: {}", e);
            token.cancel();
            return Err(Error::Api(format!("REST server error: {}", e)));
        }
        Ok(())
    }
}
