//! Error types for the disk daemon
//!
//! Provides structured error types for command execution, tool output
//! parsing, block topology resolution and the local report API.

use thiserror::Error;

/// Unified error type for the daemon
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Wraps an inner error with the purpose of the step that failed
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },

    // =========================================================================
    // Command Execution Errors
    // =========================================================================
    #[error("command '{command}' failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("unable to parse {what} output: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    // =========================================================================
    // Topology Errors
    // =========================================================================
    #[error("no blockdevices found for 'lsblk' output")]
    EmptyTopology,

    #[error("device '{device}' is not found on a node")]
    DeviceNotFound { device: String },

    #[error("detected multidisk setup, which is not supported: {}", parents.join(","))]
    MultiDisk { parents: Vec<String> },

    #[error("device '{device}' is part of a parent cycle")]
    TopologyCycle { device: String },

    // =========================================================================
    // API Errors
    // =========================================================================
    #[error("API server error: {0}")]
    Api(String),

    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap this error with a description of the step that produced it
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any context wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if this error describes an inconsistent or unsupported topology
    /// rather than a failing tool
    pub fn is_topology_error(&self) -> bool {
        matches!(
            self.root(),
            Error::EmptyTopology
                | Error::DeviceNotFound { .. }
                | Error::MultiDisk { .. }
                | Error::TopologyCycle { .. }
        )
    }
}

/// Adds step context to fallible results
pub trait ResultExt<T> {
    /// Wrap the error, if any, with `context`
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Wrap the error, if any, with a lazily built context
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.context(f()))
    }
}

/// Result type alias for the daemon
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_context_chain_message() {
        let err = Error::EmptyTopology
            .context("failed to get lsblk info")
            .context("daemon failed to prepare block device report");
        assert_eq!(
            err.to_string(),
            "daemon failed to prepare block device report: failed to get lsblk info: no blockdevices found for 'lsblk' output"
        );
        assert_matches!(err.root(), Error::EmptyTopology);
    }

    #[test]
    fn test_multidisk_message() {
        let err = Error::MultiDisk {
            parents: vec!["/dev/vda15".into(), "/dev/vdh1".into()],
        };
        assert_eq!(
            err.to_string(),
            "detected multidisk setup, which is not supported: /dev/vda15,/dev/vdh1"
        );
    }

    #[test]
    fn test_topology_classification() {
        let wrapped = Error::DeviceNotFound {
            device: "/dev/vdx".into(),
        }
        .context("failed to resolve disk");
        assert!(wrapped.is_topology_error());

        let command = Error::CommandFailed {
            command: "lsblk -J -p -O".into(),
            reason: "exit status: 1".into(),
        };
        assert!(!command.is_topology_error());
    }

    #[test]
    fn test_result_ext_lazy_context() {
        let result: Result<()> = Err(Error::Configuration("zero interval".into()));
        let err = result
            .with_context(|| format!("failed to start on port {}", 9999))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to start on port 9999: Configuration error: zero interval"
        );
    }
}
