//! Command Executor
//!
//! Runs introspection commands through `/bin/sh -c` on the host.

use crate::domain::ports::{CommandOutput, CommandRunner};
use crate::error::{Error, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error};

// =============================================================================
// Constants
// =============================================================================

const SHELL: &str = "/bin/sh";

// =============================================================================
// Shell Runner
// =============================================================================

/// Production [`CommandRunner`] backed by the system shell
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    /// Runner using `/bin/sh`
    pub fn new() -> Self {
        Self {
            shell: SHELL.to_string(),
        }
    }

    /// Runner using another POSIX shell
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> Result<CommandOutput> {
        debug!("Running command: {}", command);

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .output()
            .await
            .map_err(|e| Error::CommandFailed {
                command: command.to_string(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            error!("Command '{}' failed, stderr: {}", command, stderr.trim());
            let reason = match stderr.trim() {
                "" => output.status.to_string(),
                text => format!("{}: {}", output.status, text),
            };
            return Err(Error::CommandFailed {
                command: command.to_string(),
                reason,
            });
        }

        if !stderr.trim().is_empty() {
            debug!("Command '{}' stderr: {}", command, stderr.trim());
        }

        Ok(CommandOutput { stdout, stderr })
    }
}
