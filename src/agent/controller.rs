// src/agent/controller.rs

//! Agent lifecycle controller.
//!
//! One branch point: with an agency address the agent registers and waits
//! for the agency to stop it; without one it runs the first file directly.
//! Every way out of [`LifecycleController::run`] is an [`AgentExitCode`],
//! except a direct run with no file, which is a configuration error.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::agent::{
    AgencyProcess, AgentContext, Debugger, DebuggerError, LifecycleState, PlatformDebugger,
    ProcessLocator, RemoteAgent, RemoteAgentFactory, SystemProcessLocator, TcpAgentFactory,
};
use crate::cli::AgentOptions;
use crate::errors::{AgentError, Result};
use crate::exit_code::AgentExitCode;
use crate::package::TestPackage;
use crate::results::writer::result_file_path;
use crate::results::{ResultSummary, write_result_file};
use crate::runner::{CommandTestEngine, TestEngine, TestFilter};

/// How long each stop-signal wait lasts before the agency is checked.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Everything the controller talks to.
pub struct Collaborators {
    pub agents: Box<dyn RemoteAgentFactory>,
    pub locator: Box<dyn ProcessLocator>,
    pub debugger: Box<dyn Debugger>,
    pub engine: Box<dyn TestEngine>,
    /// Where the direct-mode report is printed.
    pub out: Box<dyn Write + Send>,
}

impl Collaborators {
    /// Production collaborators for the process described by `context`.
    pub fn system(context: &AgentContext) -> Self {
        Self {
            agents: Box::new(TcpAgentFactory),
            locator: Box::new(SystemProcessLocator),
            debugger: Box::new(PlatformDebugger::from_env(context.pid)),
            engine: Box::new(CommandTestEngine::new()),
            out: Box::new(std::io::stdout()),
        }
    }
}

pub struct LifecycleController {
    context: AgentContext,
    options: AgentOptions,
    collaborators: Collaborators,
    state: LifecycleState,
    poll_interval: Duration,
}

impl fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleController")
            .field("context", &self.context)
            .field("state", &self.state)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl LifecycleController {
    pub fn new(context: AgentContext, options: AgentOptions, collaborators: Collaborators) -> Self {
        Self {
            context,
            options,
            collaborators,
            state: LifecycleState::NotStarted,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Run the agent to completion.
    pub async fn run(&mut self) -> Result<AgentExitCode> {
        info!(pid = self.context.pid, version = %self.context.version, "agent process starting");

        let agency_url = self.options.agency_url().map(str::to_string);

        if agency_url.is_none() && self.options.files.is_empty() {
            return Err(AgentError::NoFileSpecified);
        }

        if self.options.wants_debugger() {
            if let Some(code) = launch_debugger(self.collaborators.debugger.as_ref()).await {
                return Ok(self.fault(code));
            }
        }

        match agency_url {
            Some(url) => Ok(self.run_under_agency(&url).await),
            None => Ok(self.run_directly().await),
        }
    }

    async fn run_under_agency(&mut self, agency_url: &str) -> AgentExitCode {
        info!(
            agent_id = %self.options.agent_id,
            agency_url = %agency_url,
            agency_pid = ?self.options.agency_pid,
            "registering with agency"
        );

        let mut agency = match self.options.agency_pid {
            Some(pid) => match self.collaborators.locator.locate(pid) {
                Ok(process) => Some(process),
                Err(e) => {
                    error!(agency_pid = pid, error = %e, details = ?e, "unable to locate agency process");
                    return self.fault(AgentExitCode::UnableToLocateAgency);
                }
            },
            None => {
                warn!("no agency pid supplied; agency liveness will not be monitored");
                None
            }
        };

        self.transition(LifecycleState::Registering);
        let mut agent = self
            .collaborators
            .agents
            .create(self.options.agent_id, agency_url);

        match self.drive_remote_agent(agent.as_mut(), &mut agency).await {
            Ok(code) => code,
            Err(e) => {
                error!(error = %e, details = ?e, "exception in remote agent");
                self.fault(AgentExitCode::UnexpectedException)
            }
        }
    }

    async fn drive_remote_agent(
        &mut self,
        agent: &mut dyn RemoteAgent,
        agency: &mut Option<Box<dyn AgencyProcess>>,
    ) -> Result<AgentExitCode> {
        if !agent.start().await? {
            error!("failed to start remote agent");
            return Ok(self.fault(AgentExitCode::FailedToStartRemoteAgent));
        }
        self.transition(LifecycleState::Running);

        debug!(interval_ms = self.poll_interval.as_millis() as u64, "waiting for stop signal");

        // Stop signal first, liveness second: a stop arriving in the same
        // tick as agency death is a clean stop.
        while !agent.wait_for_stop(self.poll_interval).await? {
            if let Some(process) = agency.as_mut() {
                if process.has_exited() {
                    error!(agency_pid = process.pid(), "parent process has been terminated");
                    return Ok(self.fault(AgentExitCode::ParentProcessTerminated));
                }
            }
        }

        self.transition(LifecycleState::StopRequested);
        debug!("stop signal received");
        self.transition(LifecycleState::Stopped);
        info!(pid = self.context.pid, "agent process exiting cleanly");

        Ok(AgentExitCode::Ok)
    }

    async fn run_directly(&mut self) -> AgentExitCode {
        let Some(file) = self.options.files.first().cloned() else {
            return self.fault(AgentExitCode::UnexpectedException);
        };

        self.transition(LifecycleState::Running);
        match self.execute_package(&file).await {
            Ok(()) => {
                self.transition(LifecycleState::Stopped);
                AgentExitCode::Ok
            }
            Err(e) => {
                error!(file = %file.display(), error = %e, details = ?e, "direct execution failed");
                self.fault(AgentExitCode::UnexpectedException)
            }
        }
    }

    async fn execute_package(&mut self, file: &Path) -> Result<()> {
        let out = &mut self.collaborators.out;
        writeln!(out, "\nTestAgent {}", self.context.version)?;
        writeln!(out, "\nTest File: {}", file.display())?;

        let package = TestPackage::new(file);
        let filter = TestFilter::Empty;
        let result = self.collaborators.engine.run(&package, &filter).await?;
        let summary = ResultSummary::from_node(&result)?;

        let out = &mut self.collaborators.out;
        writeln!(out, "\nAgent Result")?;
        writeln!(out, "  Overall result: {}", summary.result)?;
        writeln!(out, "  {}", summary.summary_line())?;

        let path = result_file_path(&self.options.work_directory());
        write_result_file(&result, &path)?;
        writeln!(out, "Saved result file as {}", path.display())?;
        out.flush()?;

        Ok(())
    }

    fn fault(&mut self, code: AgentExitCode) -> AgentExitCode {
        self.transition(LifecycleState::Faulted);
        code
    }

    fn transition(&mut self, next: LifecycleState) {
        if self.state.can_transition_to(next) {
            debug!(from = ?self.state, to = ?next, "lifecycle transition");
            self.state = next;
        } else {
            warn!(from = ?self.state, to = ?next, "ignoring illegal lifecycle transition");
        }
    }
}

/// Returns the exit code to stop with, or `None` to carry on.
async fn launch_debugger(debugger: &dyn Debugger) -> Option<AgentExitCode> {
    if debugger.is_attached() {
        return None;
    }

    match debugger.launch().await {
        Ok(()) => None,
        Err(DebuggerError::SecurityViolation(msg)) => {
            error!(reason = %msg, "not permitted to start the debugger");
            Some(AgentExitCode::DebuggerSecurityViolation)
        }
        Err(DebuggerError::NotImplemented(msg)) => {
            error!(reason = %msg, "debugger is not available on this platform");
            Some(AgentExitCode::DebuggerNotImplemented)
        }
    }
}
