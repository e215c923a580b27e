// src/agent/agency.rs

//! Agency liveness via `sysinfo`.

use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};
use tracing::debug;

use crate::agent::{AgencyProcess, ProcessLocator};
use crate::errors::{AgentError, Result};

/// Locates processes through the OS process table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessLocator;

impl ProcessLocator for SystemProcessLocator {
    fn locate(&self, pid: u32) -> Result<Box<dyn AgencyProcess>> {
        let mut process = SystemAgencyProcess::new(pid);
        if process.has_exited() {
            return Err(AgentError::AgencyNotFound(pid));
        }
        debug!(pid, "agency process located");
        Ok(Box::new(process))
    }
}

/// Polled view of one OS process. Never signals the process.
pub struct SystemAgencyProcess {
    pid: Pid,
    system: System,
}

impl SystemAgencyProcess {
    pub fn new(pid: u32) -> Self {
        Self {
            pid: Pid::from_u32(pid),
            system: System::new(),
        }
    }
}

impl AgencyProcess for SystemAgencyProcess {
    fn pid(&self) -> u32 {
        self.pid.as_u32()
    }

    /// A process that vanished from the table, or only lingers as a zombie,
    /// counts as exited.
    fn has_exited(&mut self) -> bool {
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);

        match self.system.process(self.pid) {
            None => true,
            Some(process) => matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead),
        }
    }
}
