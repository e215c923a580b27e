#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use testagent::agent::{
    AgencyProcess, BoxFuture, Debugger, DebuggerError, ProcessLocator, RemoteAgent,
    RemoteAgentFactory,
};
use testagent::errors::{AgentError, Result};
use testagent::package::TestPackage;
use testagent::results::ResultNode;
use testagent::runner::{TestEngine, TestFilter};

/// What a [`FakeRemoteAgent`] does when started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    Refused,
    Fails,
}

/// Script for every agent a [`FakeAgentFactory`] hands out.
#[derive(Debug, Clone)]
pub struct AgentScript {
    pub start: StartOutcome,
    /// 1-based `wait_for_stop` call that sees the stop signal.
    pub stop_on_wait: Option<usize>,
    /// 1-based `wait_for_stop` call that returns an error.
    pub fail_on_wait: Option<usize>,
}

impl AgentScript {
    pub fn stops_on(wait: usize) -> Self {
        Self {
            start: StartOutcome::Started,
            stop_on_wait: Some(wait),
            fail_on_wait: None,
        }
    }

    pub fn never_stops() -> Self {
        Self {
            start: StartOutcome::Started,
            stop_on_wait: None,
            fail_on_wait: None,
        }
    }

    pub fn refuses_to_start() -> Self {
        Self {
            start: StartOutcome::Refused,
            ..Self::never_stops()
        }
    }

    pub fn fails_to_start() -> Self {
        Self {
            start: StartOutcome::Fails,
            ..Self::never_stops()
        }
    }

    pub fn fails_on_wait(wait: usize) -> Self {
        Self {
            fail_on_wait: Some(wait),
            ..Self::never_stops()
        }
    }
}

/// What happened to the fake agents, shared with the test.
#[derive(Debug, Default)]
pub struct AgentRecord {
    pub created: Vec<(Uuid, String)>,
    pub starts: usize,
    pub waits: usize,
    pub timeouts: Vec<Duration>,
}

pub struct FakeRemoteAgent {
    script: AgentScript,
    record: Arc<Mutex<AgentRecord>>,
}

impl RemoteAgent for FakeRemoteAgent {
    fn start(&mut self) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move {
            self.record.lock().unwrap().starts += 1;
            match self.script.start {
                StartOutcome::Started => Ok(true),
                StartOutcome::Refused => Ok(false),
                StartOutcome::Fails => Err(AgentError::TransportError(
                    "fake transport blew up".to_string(),
                )),
            }
        })
    }

    fn wait_for_stop(&mut self, timeout: Duration) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move {
            let wait = {
                let mut record = self.record.lock().unwrap();
                record.waits += 1;
                record.timeouts.push(timeout);
                record.waits
            };

            if self.script.fail_on_wait == Some(wait) {
                return Err(AgentError::TransportError(
                    "fake connection dropped".to_string(),
                ));
            }
            match self.script.stop_on_wait {
                Some(stop) if wait >= stop => Ok(true),
                _ => {
                    tokio::task::yield_now().await;
                    Ok(false)
                }
            }
        })
    }
}

pub struct FakeAgentFactory {
    script: AgentScript,
    record: Arc<Mutex<AgentRecord>>,
}

impl FakeAgentFactory {
    pub fn new(script: AgentScript) -> (Self, Arc<Mutex<AgentRecord>>) {
        let record = Arc::new(Mutex::new(AgentRecord::default()));
        (
            Self {
                script,
                record: Arc::clone(&record),
            },
            record,
        )
    }
}

impl RemoteAgentFactory for FakeAgentFactory {
    fn create(&self, agent_id: Uuid, agency_url: &str) -> Box<dyn RemoteAgent> {
        self.record
            .lock()
            .unwrap()
            .created
            .push((agent_id, agency_url.to_string()));
        Box::new(FakeRemoteAgent {
            script: self.script.clone(),
            record: Arc::clone(&self.record),
        })
    }
}

/// Agency that dies on the given 1-based liveness check.
pub struct FakeAgencyProcess {
    pid: u32,
    exits_on_check: Option<usize>,
    checks: Arc<Mutex<usize>>,
}

impl AgencyProcess for FakeAgencyProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn has_exited(&mut self) -> bool {
        let mut checks = self.checks.lock().unwrap();
        *checks += 1;
        matches!(self.exits_on_check, Some(n) if *checks >= n)
    }
}

/// Resolves exactly one pid; anything else is "not found".
pub struct FakeProcessLocator {
    pid: Option<u32>,
    exits_on_check: Option<usize>,
    checks: Arc<Mutex<usize>>,
    lookups: Arc<Mutex<Vec<u32>>>,
}

impl FakeProcessLocator {
    pub fn alive(pid: u32) -> Self {
        Self {
            pid: Some(pid),
            exits_on_check: None,
            checks: Arc::new(Mutex::new(0)),
            lookups: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn dies_on_check(pid: u32, check: usize) -> Self {
        Self {
            exits_on_check: Some(check),
            ..Self::alive(pid)
        }
    }

    pub fn nothing() -> Self {
        Self {
            pid: None,
            ..Self::alive(0)
        }
    }

    /// Number of liveness checks made so far.
    pub fn checks(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.checks)
    }

    pub fn lookups(&self) -> Arc<Mutex<Vec<u32>>> {
        Arc::clone(&self.lookups)
    }
}

impl ProcessLocator for FakeProcessLocator {
    fn locate(&self, pid: u32) -> Result<Box<dyn AgencyProcess>> {
        self.lookups.lock().unwrap().push(pid);
        if self.pid != Some(pid) {
            return Err(AgentError::AgencyNotFound(pid));
        }
        Ok(Box::new(FakeAgencyProcess {
            pid,
            exits_on_check: self.exits_on_check,
            checks: Arc::clone(&self.checks),
        }))
    }
}

pub struct FakeDebugger {
    attached: bool,
    outcome: std::result::Result<(), DebuggerError>,
    launches: Arc<Mutex<usize>>,
}

impl FakeDebugger {
    pub fn launches_ok() -> Self {
        Self {
            attached: false,
            outcome: Ok(()),
            launches: Arc::new(Mutex::new(0)),
        }
    }

    pub fn already_attached() -> Self {
        Self {
            attached: true,
            ..Self::launches_ok()
        }
    }

    pub fn denied() -> Self {
        Self {
            outcome: Err(DebuggerError::SecurityViolation("ptrace denied".to_string())),
            ..Self::launches_ok()
        }
    }

    pub fn unsupported() -> Self {
        Self {
            outcome: Err(DebuggerError::NotImplemented("no debugger here".to_string())),
            ..Self::launches_ok()
        }
    }

    pub fn launches(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.launches)
    }
}

impl Debugger for FakeDebugger {
    fn is_attached(&self) -> bool {
        self.attached
    }

    fn launch(&self) -> BoxFuture<'_, std::result::Result<(), DebuggerError>> {
        *self.launches.lock().unwrap() += 1;
        let outcome = self.outcome.clone();
        Box::pin(async move { outcome })
    }
}

/// Engine that returns a canned result tree, or fails.
pub struct FakeTestEngine {
    outcome: std::result::Result<ResultNode, String>,
    runs: Arc<Mutex<Vec<(TestPackage, TestFilter)>>>,
}

impl FakeTestEngine {
    pub fn returning(node: ResultNode) -> Self {
        Self {
            outcome: Ok(node),
            runs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            runs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn runs(&self) -> Arc<Mutex<Vec<(TestPackage, TestFilter)>>> {
        Arc::clone(&self.runs)
    }
}

impl TestEngine for FakeTestEngine {
    fn run<'a>(
        &'a mut self,
        package: &'a TestPackage,
        filter: &'a TestFilter,
    ) -> BoxFuture<'a, Result<ResultNode>> {
        Box::pin(async move {
            self.runs
                .lock()
                .unwrap()
                .push((package.clone(), filter.clone()));
            self.outcome
                .clone()
                .map_err(|msg| AgentError::Other(anyhow::anyhow!(msg)))
        })
    }
}

/// `Write` sink whose contents the test can read back.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
