// src/exit_code.rs

//! Exit status taxonomy shared by the agent process and whoever spawned it.
//!
//! The numeric values are a wire contract with existing agencies and must
//! not change.

use std::fmt;

/// Why an agent process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentExitCode {
    /// Clean stop signal, or a successful direct run.
    Ok,
    /// The agency process was observed exited before a stop signal arrived.
    ParentProcessTerminated,
    /// The remote agent refused to start.
    FailedToStartRemoteAgent,
    /// Attaching a debugger was denied by the platform.
    DebuggerSecurityViolation,
    /// Attaching a debugger is not supported on this platform.
    DebuggerNotImplemented,
    /// The supplied agency pid does not resolve to a live process.
    UnableToLocateAgency,
    /// Any uncaught failure while running tests.
    UnexpectedException,
}

impl AgentExitCode {
    pub const ALL: [AgentExitCode; 7] = [
        AgentExitCode::Ok,
        AgentExitCode::ParentProcessTerminated,
        AgentExitCode::FailedToStartRemoteAgent,
        AgentExitCode::DebuggerSecurityViolation,
        AgentExitCode::DebuggerNotImplemented,
        AgentExitCode::UnableToLocateAgency,
        AgentExitCode::UnexpectedException,
    ];

    /// Numeric code handed to the operating system.
    pub const fn code(self) -> i32 {
        match self {
            AgentExitCode::Ok => 0,
            AgentExitCode::ParentProcessTerminated => -1,
            AgentExitCode::FailedToStartRemoteAgent => -2,
            AgentExitCode::DebuggerSecurityViolation => -3,
            AgentExitCode::DebuggerNotImplemented => -4,
            AgentExitCode::UnableToLocateAgency => -5,
            AgentExitCode::UnexpectedException => -100,
        }
    }

    /// Interpret an exit status observed by a parent process.
    ///
    /// POSIX parents only see the low 8 bits, so `255` maps back to `-1`
    /// and `156` to `-100`. Unknown codes yield `None`.
    pub fn from_raw(raw: i32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.code() == raw || (c.code() & 0xFF) == raw)
    }

    pub fn is_success(self) -> bool {
        self == AgentExitCode::Ok
    }

    pub const fn name(self) -> &'static str {
        match self {
            AgentExitCode::Ok => "OK",
            AgentExitCode::ParentProcessTerminated => "PARENT_PROCESS_TERMINATED",
            AgentExitCode::FailedToStartRemoteAgent => "FAILED_TO_START_REMOTE_AGENT",
            AgentExitCode::DebuggerSecurityViolation => "DEBUGGER_SECURITY_VIOLATION",
            AgentExitCode::DebuggerNotImplemented => "DEBUGGER_NOT_IMPLEMENTED",
            AgentExitCode::UnableToLocateAgency => "UNABLE_TO_LOCATE_AGENCY",
            AgentExitCode::UnexpectedException => "UNEXPECTED_EXCEPTION",
        }
    }
}

impl fmt::Display for AgentExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

impl From<AgentExitCode> for i32 {
    fn from(code: AgentExitCode) -> Self {
        code.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(AgentExitCode::Ok.code(), 0);
        assert_eq!(AgentExitCode::ParentProcessTerminated.code(), -1);
        assert_eq!(AgentExitCode::FailedToStartRemoteAgent.code(), -2);
        assert_eq!(AgentExitCode::DebuggerSecurityViolation.code(), -3);
        assert_eq!(AgentExitCode::DebuggerNotImplemented.code(), -4);
        assert_eq!(AgentExitCode::UnableToLocateAgency.code(), -5);
        assert_eq!(AgentExitCode::UnexpectedException.code(), -100);
    }

    #[test]
    fn from_raw_accepts_signed_and_wrapped_values() {
        assert_eq!(AgentExitCode::from_raw(0), Some(AgentExitCode::Ok));
        assert_eq!(
            AgentExitCode::from_raw(-1),
            Some(AgentExitCode::ParentProcessTerminated)
        );
        assert_eq!(
            AgentExitCode::from_raw(255),
            Some(AgentExitCode::ParentProcessTerminated)
        );
        assert_eq!(
            AgentExitCode::from_raw(156),
            Some(AgentExitCode::UnexpectedException)
        );
        assert_eq!(
            AgentExitCode::from_raw(251),
            Some(AgentExitCode::UnableToLocateAgency)
        );
        assert_eq!(AgentExitCode::from_raw(1), None);
        assert_eq!(AgentExitCode::from_raw(42), None);
    }

    #[test]
    fn codes_are_distinct() {
        for a in AgentExitCode::ALL {
            for b in AgentExitCode::ALL {
                if a != b {
                    assert_ne!(a.code(), b.code());
                    assert_ne!(a.code() & 0xFF, b.code() & 0xFF);
                }
            }
        }
    }

    #[test]
    fn display_includes_name_and_code() {
        assert_eq!(
            AgentExitCode::UnableToLocateAgency.to_string(),
            "UNABLE_TO_LOCATE_AGENCY (-5)"
        );
    }
}
