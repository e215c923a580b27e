// src/agent/debugger.rs

//! Platform debugger hook.
//!
//! There is no portable "attach a debugger to me" call, so the agent starts
//! whatever command `TESTAGENT_DEBUGGER` names (with `{pid}` replaced by its
//! own pid, e.g. `gdb -p {pid}`) and waits briefly for it to attach.

use std::io::ErrorKind;
use std::sync::Mutex;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::agent::{BoxFuture, Debugger, DebuggerError};

pub const DEBUGGER_COMMAND_ENV: &str = "TESTAGENT_DEBUGGER";

#[derive(Debug)]
pub struct PlatformDebugger {
    pid: u32,
    command: Option<String>,
    attach_timeout: Duration,
    /// The launched debugger, kept so it is reaped rather than orphaned.
    session: Mutex<Option<Child>>,
}

impl PlatformDebugger {
    pub fn from_env(pid: u32) -> Self {
        let command = std::env::var(DEBUGGER_COMMAND_ENV)
            .ok()
            .filter(|c| !c.trim().is_empty());
        Self::with_command(pid, command)
    }

    pub fn with_command(pid: u32, command: Option<String>) -> Self {
        Self {
            pid,
            command,
            attach_timeout: Duration::from_secs(10),
            session: Mutex::new(None),
        }
    }

    pub fn with_attach_timeout(mut self, timeout: Duration) -> Self {
        self.attach_timeout = timeout;
        self
    }

    async fn wait_for_attach(&self) {
        let deadline = Instant::now() + self.attach_timeout;
        while Instant::now() < deadline {
            if self.is_attached() {
                info!(pid = self.pid, "debugger attached");
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        warn!(pid = self.pid, "debugger started but did not attach in time; continuing");
    }

    /// Whether the launched debugger is still running.
    pub fn session_running(&self) -> bool {
        let Ok(mut session) = self.session.lock() else {
            return false;
        };
        match session.as_mut().map(|child| child.try_wait()) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                info!(pid = self.pid, %status, "debugger exited");
                *session = None;
                false
            }
            Some(Err(_)) | None => false,
        }
    }

    fn spawn(&self) -> Result<(), DebuggerError> {
        if !cfg!(target_os = "linux") {
            return Err(DebuggerError::NotImplemented(format!(
                "debugger attach is not supported on {}",
                std::env::consts::OS
            )));
        }

        let Some(template) = &self.command else {
            return Err(DebuggerError::NotImplemented(format!(
                "{DEBUGGER_COMMAND_ENV} is not set"
            )));
        };

        let command_line = template.replace("{pid}", &self.pid.to_string());
        let mut parts = command_line.split_whitespace();
        let Some(program) = parts.next() else {
            return Err(DebuggerError::NotImplemented(format!(
                "{DEBUGGER_COMMAND_ENV} is empty"
            )));
        };

        match Command::new(program).args(parts).spawn() {
            Ok(child) => {
                info!(pid = self.pid, debugger_pid = ?child.id(), program, "debugger launched");
                if let Ok(mut session) = self.session.lock() {
                    *session = Some(child);
                }
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(
                DebuggerError::SecurityViolation(format!("{program}: {e}")),
            ),
            Err(e) => Err(DebuggerError::NotImplemented(format!(
                "unable to start debugger {program}: {e}"
            ))),
        }
    }
}

impl Debugger for PlatformDebugger {
    fn is_attached(&self) -> bool {
        tracer_pid().is_some_and(|pid| pid != 0)
    }

    fn launch(&self) -> BoxFuture<'_, Result<(), DebuggerError>> {
        Box::pin(async move {
            self.spawn()?;
            self.wait_for_attach().await;
            Ok(())
        })
    }
}

#[cfg(target_os = "linux")]
fn tracer_pid() -> Option<u32> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    status
        .lines()
        .find_map(|line| line.strip_prefix("TracerPid:"))
        .and_then(|v| v.trim().parse().ok())
}

#[cfg(not(target_os = "linux"))]
fn tracer_pid() -> Option<u32> {
    None
}
