//! Execution of the wrapped command-line tools.
//!
//! Stages never spawn processes directly; they go through a `CommandRunner`
//! so the whole pipeline can run against a fake in tests.

use async_trait::async_trait;
use std::ffi::OsString;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, warn};

use sieve_common::{Result, SieveError};

/// Captured result of one tool invocation.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Text persisted as a tool log: stdout followed by any stderr.
    pub fn combined(&self) -> String {
        if self.stderr.trim().is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Common interface for running an external program to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput>;
}

pub type SharedRunner = Arc<dyn CommandRunner>;

/// Runs programs on the host via `tokio::process`.
#[derive(Debug, Default, Clone)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput> {
        debug!(program, ?args, "Spawning");
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|source| SieveError::Spawn { program: program.to_string(), source })?;

        let result = CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        if !result.success {
            // Exit status is not validated further; a failure shows up as a
            // missing artifact in the next stage.
            warn!(program, status = ?output.status, "Tool exited unsuccessfully");
        }
        Ok(result)
    }
}

/// Build an argument vector from anything path- or string-like.
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        vec![$(::std::ffi::OsString::from($arg)),*]
    };
}
