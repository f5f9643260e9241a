//! One-shot report client used by the query modes of the binary

use crate::error::Result;
use std::time::Duration;
use tracing::debug;

/// Report endpoints of a running daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    ApiCheck,
    FullReport,
    OsdReport,
}

impl ReportKind {
    pub fn path(&self) -> &'static str {
        match self {
            ReportKind::ApiCheck => super::rest::API_CHECK_PATH,
            ReportKind::FullReport => super::rest::FULL_REPORT_PATH,
            ReportKind::OsdReport => super::rest::OSD_REPORT_PATH,
        }
    }
}

/// HTTP client for the daemon's loopback API
pub struct ReportClient {
    http: reqwest::Client,
    base_url: String,
}

impl ReportClient {
    pub fn new(port: u16) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: format!("http://127.0.0.1:{}", port),
        })
    }

    /// Fetch an endpoint and return its normalized body
    pub async fn fetch(&self, kind: ReportKind) -> Result<String> {
        let url = format!("{}{}", self.base_url, kind.path());
        debug!("GET {}", url);
        let body = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(normalize_body(&body))
    }
}

/// Strip surrounding newlines and print a JSON `null` as `{}`
pub fn normalize_body(body: &str) -> String {
    match body.trim_matches('\n') {
        "null" => "{}".to_string(),
        trimmed => trimmed.to_string(),
    }
}
