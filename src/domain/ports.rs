//! Domain Ports - the operating system boundary of the daemon
//!
//! Every piece of host introspection goes through [`CommandRunner`], so
//! the collectors can be driven by scripted output in tests.

use crate::error::Result;
use async_trait::async_trait;

// =============================================================================
// Command Execution
// =============================================================================

/// Captured output of a successfully executed command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error, which some tools write warnings to even on success
    pub stderr: String,
}

impl CommandOutput {
    /// Output with the given stdout and an empty stderr
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

/// Runs a shell command line on the host
///
/// Implementations return `Error::CommandFailed` when the command cannot be
/// started or exits non-zero.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` through the shell and capture its output
    async fn run(&self, command: &str) -> Result<CommandOutput>;
}
