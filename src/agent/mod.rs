// src/agent/mod.rs

//! The agent process's side of the lifecycle.
//!
//! The pure decision logic lives in [`controller`]; it only talks to the
//! outside world through the collaborator traits defined here, so tests can
//! drive every exit path without a real agency, transport or debugger.
//!
//! Production collaborators:
//! - [`transport`]: TCP-backed [`RemoteAgent`].
//! - [`agency`]: `sysinfo`-backed [`ProcessLocator`].
//! - [`debugger`]: platform [`Debugger`] hook.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::errors::Result;

pub mod agency;
pub mod controller;
pub mod debugger;
pub mod transport;

pub use agency::{SystemAgencyProcess, SystemProcessLocator};
pub use controller::{Collaborators, LifecycleController, POLL_INTERVAL};
pub use debugger::PlatformDebugger;
pub use transport::{TcpAgentFactory, TcpRemoteAgent};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Where the agent is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    NotStarted,
    Registering,
    Running,
    StopRequested,
    Stopped,
    Faulted,
}

impl LifecycleState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Stopped | LifecycleState::Faulted)
    }

    /// Allowed transitions. `Faulted` is reachable from every non-terminal
    /// state; direct runs go straight from `NotStarted` to `Running`.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        match (self, next) {
            (from, Faulted) => !from.is_terminal(),
            (NotStarted, Registering) => true,
            (NotStarted, Running) => true,
            (Registering, Running) => true,
            (Running, StopRequested) => true,
            (Running, Stopped) => true,
            (StopRequested, Stopped) => true,
            _ => false,
        }
    }
}

/// Facts about the agent process itself, supplied once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentContext {
    pub pid: u32,
    pub version: String,
}

impl AgentContext {
    pub fn current() -> Self {
        Self {
            pid: std::process::id(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// The agent's registration with an agency, over some transport.
///
/// An `Err` from either method is an unexpected fault, not a refusal.
pub trait RemoteAgent: Send {
    /// Connect and register. `Ok(false)` means the agency could not be
    /// reached or refused the registration.
    fn start(&mut self) -> BoxFuture<'_, Result<bool>>;

    /// Wait up to `timeout` for the agency's stop signal. Returns `true`
    /// once the signal has been received.
    fn wait_for_stop(&mut self, timeout: Duration) -> BoxFuture<'_, Result<bool>>;
}

/// Builds a [`RemoteAgent`] bound to an identity and agency address.
pub trait RemoteAgentFactory: Send + Sync {
    fn create(&self, agent_id: Uuid, agency_url: &str) -> Box<dyn RemoteAgent>;
}

/// Read-only handle on the agency's OS process.
pub trait AgencyProcess: Send {
    fn pid(&self) -> u32;

    fn has_exited(&mut self) -> bool;
}

/// Resolves a pid to a live [`AgencyProcess`].
pub trait ProcessLocator: Send + Sync {
    fn locate(&self, pid: u32) -> Result<Box<dyn AgencyProcess>>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DebuggerError {
    #[error("debugger attach denied: {0}")]
    SecurityViolation(String),

    #[error("debugger attach not supported: {0}")]
    NotImplemented(String),
}

/// Platform debugger hook.
pub trait Debugger: Send + Sync {
    fn is_attached(&self) -> bool;

    /// Start a debugger for this process and give it a chance to attach.
    fn launch(&self) -> BoxFuture<'_, std::result::Result<(), DebuggerError>>;
}

#[cfg(test)]
mod tests {
    use super::LifecycleState::*;

    #[test]
    fn agency_path_is_allowed() {
        assert!(NotStarted.can_transition_to(Registering));
        assert!(Registering.can_transition_to(Running));
        assert!(Running.can_transition_to(StopRequested));
        assert!(StopRequested.can_transition_to(Stopped));
    }

    #[test]
    fn faulted_is_reachable_until_terminal() {
        for s in [NotStarted, Registering, Running, StopRequested] {
            assert!(s.can_transition_to(Faulted));
        }
        assert!(!Stopped.can_transition_to(Faulted));
        assert!(!Faulted.can_transition_to(Faulted));
    }

    #[test]
    fn shortcuts_are_rejected() {
        assert!(!NotStarted.can_transition_to(Stopped));
        assert!(!Registering.can_transition_to(StopRequested));
        assert!(!Stopped.can_transition_to(Running));
        assert!(!Faulted.can_transition_to(Running));
    }
}
