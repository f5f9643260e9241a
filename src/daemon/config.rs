//! Daemon Configuration

use crate::error::{Error, Result};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default port of the local report API
pub const DEFAULT_PORT: u16 = 9999;

/// Default interval between two pipeline passes
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for the disk daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Address the report API binds to
    pub bind_address: IpAddr,
    /// Port the report API listens on
    pub port: u16,
    /// Interval between two pipeline passes
    pub check_interval: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

impl DaemonConfig {
    /// Socket address of the report API
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.check_interval.is_zero() {
            return Err(Error::Configuration(
                "check interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
