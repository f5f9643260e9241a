//! Ceph Disk Daemon
//!
//! Runs the node-local disk report daemon, or queries a running one.
//!
//! ```text
//! ceph-disk-daemon --daemon [--port 9999]     serve and refresh the report
//! ceph-disk-daemon --api-check                 liveness of a running daemon
//! ceph-disk-daemon --full-report               print the full report
//! ceph-disk-daemon --osd-report                print the report without disks
//! ```

use clap::{ArgGroup, Parser};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ceph_disk_daemon::daemon::{DEFAULT_CHECK_INTERVAL, DEFAULT_PORT};
use ceph_disk_daemon::{DaemonConfig, DiskDaemon, ReportClient, ReportKind, Result, ShellRunner};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Ceph Disk Daemon - node-local disk and OSD topology report
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["daemon", "api_check", "full_report", "osd_report"])
))]
struct Args {
    /// Run the daemon
    #[arg(long)]
    daemon: bool,

    /// Check that a running daemon answers
    #[arg(long)]
    api_check: bool,

    /// Print the full report of a running daemon
    #[arg(long)]
    full_report: bool,

    /// Print the OSD report of a running daemon
    #[arg(long)]
    osd_report: bool,

    /// Report API port
    #[arg(long, env = "DISK_DAEMON_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Interval between two disk checks in seconds
    #[arg(long, env = "DISK_DAEMON_CHECK_INTERVAL", default_value_t = DEFAULT_CHECK_INTERVAL.as_secs())]
    check_interval_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    /// Endpoint to query, or `None` in daemon mode
    fn query(&self) -> Option<ReportKind> {
        if self.api_check {
            Some(ReportKind::ApiCheck)
        } else if self.full_report {
            Some(ReportKind::FullReport)
        } else if self.osd_report {
            Some(ReportKind::OsdReport)
        } else {
            None
        }
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    match args.query() {
        Some(kind) => {
            let body = ReportClient::new(args.port)?.fetch(kind).await?;
            println!("{}", body);
            Ok(())
        }
        None => run_daemon(&args).await,
    }
}

async fn run_daemon(args: &Args) -> Result<()> {
    let config = DaemonConfig {
        port: args.port,
        check_interval: Duration::from_secs(args.check_interval_secs),
        ..Default::default()
    };
    config.validate()?;

    info!("Starting Ceph Disk Daemon");
    info!("  Version: {}", ceph_disk_daemon::VERSION);
    info!("  REST API: {}", config.socket_addr());
    info!("  Check interval: {:?}", config.check_interval);

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received interrupt, shutting down");
                signal_token.cancel();
            }
            Err(e) => error!("Failed to listen for interrupt: {}", e),
        }
    });

    DiskDaemon::new(config, Arc::new(ShellRunner::new()))
        .run(token)
        .await?;

    info!("Daemon shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "reqwest=warn", "tower=warn", "axum=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    // Query modes print the report on stdout
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
