//! Single command execution
//!
//! Runs one [`CommandSpec`] through the host shell and captures its output,
//! exit status and wall-clock timing into a [`CommandResult`]. Failures of
//! the command itself are data, not errors: they show up in the result and
//! never abort the run.

use std::process::{Command, ExitStatus, Output};

use anyhow::Result;
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::CommandSpec;
use crate::parallel::{ParallelConfig, ParallelProcessor};

/// Exit code recorded when the shell itself could not be started
pub const SPAWN_FAILURE_CODE: i32 = -1;

/// Outcome of running one command
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommandResult {
    pub label: String,
    pub command: String,
    pub attachment_only: bool,
    pub label_slug: String,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub stdout: String,
    pub stderr: String,
    /// `None` only when no command was configured
    pub returncode: Option<i32>,
}

impl CommandResult {
    fn from_spec(spec: &CommandSpec, start_time: DateTime<Local>) -> Self {
        Self {
            label: spec.label.clone(),
            command: spec.command.clone(),
            attachment_only: spec.attachment_only,
            label_slug: spec.label_slug.clone(),
            start_time,
            end_time: start_time,
            stdout: String::new(),
            stderr: String::new(),
            returncode: None,
        }
    }

    /// True when the command ran and exited with status 0
    pub fn succeeded(&self) -> bool {
        self.returncode == Some(0)
    }
}

/// Shell used to interpret command strings
#[cfg(unix)]
pub const SHELL: &str = "sh";
#[cfg(unix)]
const SHELL_COMMAND_FLAG: &str = "-c";

#[cfg(windows)]
pub const SHELL: &str = "cmd";
#[cfg(windows)]
const SHELL_COMMAND_FLAG: &str = "/C";

/// Run `spec` to completion through [`SHELL`]. Never fails; see [`CommandResult`].
pub fn run_command(spec: &CommandSpec) -> CommandResult {
    run_command_with(spec, SHELL)
}

/// Run `spec` through the given shell program.
pub fn run_command_with(spec: &CommandSpec, shell: &str) -> CommandResult {
    let mut result = CommandResult::from_spec(spec, Local::now());

    if spec.command.is_empty() {
        warn!("No command specified for label '{}'", spec.label);
        result.stderr = format!("Error: No command specified for label '{}'", spec.label);
        result.end_time = Local::now();
        return result;
    }

    info!("Running command {}: {}", spec.label, spec.command);
    match Command::new(shell)
        .arg(SHELL_COMMAND_FLAG)
        .arg(&spec.command)
        .output()
    {
        Ok(Output {
            status,
            stdout,
            stderr,
        }) => {
            result.stdout = String::from_utf8_lossy(&stdout).into_owned();
            result.stderr = String::from_utf8_lossy(&stderr).into_owned();
            result.returncode = Some(exit_code(status));
        }
        Err(e) => {
            warn!("Failed to start command {}: {}", spec.label, e);
            result.stderr = format!(
                "Error: failed to run command for label '{}': {}",
                spec.label, e
            );
            result.returncode = Some(SPAWN_FAILURE_CODE);
        }
    }
    result.end_time = Local::now();

    info!(
        "Completed command {}: {} (exit {:?})",
        spec.label, spec.command, result.returncode
    );
    result
}

/// Run every spec with at most `max_workers` commands in flight.
///
/// Results come back in the same order as `specs`. Only worker-pool
/// failures are errors; failing commands are reported in their results.
pub fn run_commands<P>(
    specs: Vec<CommandSpec>,
    max_workers: usize,
    progress: Option<P>,
) -> Result<Vec<CommandResult>>
where
    P: Fn(usize, usize) + Sync,
{
    ParallelProcessor::new(ParallelConfig::with_workers(max_workers))
        .process(specs, |spec| run_command(&spec), progress)
}

/// Exit status as a number; a signal-terminated process reports `-signal`.
fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    status.code().unwrap_or(SPAWN_FAILURE_CODE)
}
