// src/launcher/spawn.rs

//! Start an agent from a [`ProcessDescriptor`] and wait for it.

use std::fmt;
use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::exit_code::AgentExitCode;
use crate::launcher::ProcessDescriptor;

/// How an agent process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentTermination {
    /// Exited on its own with this raw status code.
    Exited(i32),
    /// Killed by a signal; no exit code was reported.
    Signaled(Option<i32>),
}

impl AgentTermination {
    pub fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => AgentTermination::Exited(code),
            None => AgentTermination::Signaled(signal_of(status)),
        }
    }

    /// The taxonomy verdict. A signalled agent never reported one.
    pub fn exit_code(self) -> Option<AgentExitCode> {
        match self {
            AgentTermination::Exited(code) => AgentExitCode::from_raw(code),
            AgentTermination::Signaled(_) => None,
        }
    }

    /// Status for the launcher's own exit, shell style (`128 + signal`).
    pub fn process_exit_code(self) -> i32 {
        match self {
            AgentTermination::Exited(code) => code,
            AgentTermination::Signaled(Some(signal)) => 128 + signal,
            AgentTermination::Signaled(None) => 1,
        }
    }
}

impl fmt::Display for AgentTermination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentTermination::Exited(code) => match AgentExitCode::from_raw(*code) {
                Some(exit) => write!(f, "{exit}"),
                None => write!(f, "unrecognised exit code {code}"),
            },
            AgentTermination::Signaled(Some(signal)) => write!(f, "killed by signal {signal}"),
            AgentTermination::Signaled(None) => write!(f, "killed without an exit code"),
        }
    }
}

#[cfg(unix)]
fn signal_of(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: ExitStatus) -> Option<i32> {
    None
}

/// Spawn the agent, forward its output to the log, and report how it
/// ended.
pub async fn spawn_and_wait(descriptor: &ProcessDescriptor) -> Result<AgentTermination> {
    info!(
        program = %descriptor.program.display(),
        args = %descriptor.argument_string(),
        cwd = %descriptor.working_dir.display(),
        "starting agent process"
    );

    if descriptor.load_user_profile {
        debug!("LoadUserProfile requested; the agent inherits the caller's environment");
    }

    let mut cmd = descriptor.to_command();
    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning agent {:?}", descriptor.program))?;

    let pid = child.id();

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(pid, "agent: {}", line);
            }
        });
    }

    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(pid, "agent stderr: {}", line);
            }
        });
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for agent {:?}", descriptor.program))?;

    let termination = AgentTermination::from_status(status);
    match termination {
        AgentTermination::Exited(_) => match termination.exit_code() {
            Some(exit) if exit.is_success() => info!(pid, %exit, "agent exited"),
            Some(exit) => warn!(pid, %exit, "agent exited abnormally"),
            None => warn!(pid, %termination, "agent exited with an unknown code"),
        },
        AgentTermination::Signaled(signal) => warn!(pid, ?signal, "agent was killed by a signal"),
    }

    Ok(termination)
}
