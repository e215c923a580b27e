// src/launcher/mod.rs

//! Process invocation building.
//!
//! A launcher knows one agent image and the runtime target it can host.
//! Given a [`TestPackage`] it decides whether it is eligible and, if so,
//! builds the [`ProcessDescriptor`] the caller spawns.
//!
//! - [`runtime`] holds the concrete [`RuntimeAgentLauncher`].
//! - [`registry`] holds the ordered, first-match launcher list.
//! - [`escape`] renders arguments as shell tokens.
//! - [`spawn`] starts a descriptor as a child process and waits for it.

use std::path::PathBuf;

use tokio::process::Command;
use uuid::Uuid;

use crate::package::TestPackage;

pub mod escape;
pub mod registry;
pub mod runtime;
pub mod spawn;

pub use escape::escape_process_argument;
pub use registry::LauncherRegistry;
pub use runtime::RuntimeAgentLauncher;
pub use spawn::{AgentTermination, spawn_and_wait};

/// A runtime family plus the highest major version an agent image supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeTarget {
    family: String,
    max_version: u32,
}

impl RuntimeTarget {
    pub fn new(family: impl Into<String>, max_version: u32) -> Self {
        Self {
            family: family.into(),
            max_version,
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn max_version(&self) -> u32 {
        self.max_version
    }

    /// Does a `TargetRuntimeFramework` value like `"netcore-6.0"` fall
    /// within this target?
    ///
    /// The value must be `<family>-<major>[.<anything>]` with a numeric
    /// major no greater than `max_version`. Anything else is `false`.
    pub fn matches(&self, setting: &str) -> bool {
        let Some(rest) = setting
            .strip_prefix(self.family.as_str())
            .and_then(|r| r.strip_prefix('-'))
        else {
            return false;
        };

        let major = rest.split('.').next().unwrap_or_default();
        if major.is_empty() || !major.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }

        major
            .parse::<u32>()
            .map(|v| v <= self.max_version)
            .unwrap_or(false)
    }
}

/// Facts about the calling process that end up in an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchContext {
    /// Directory the launcher itself is installed in. Agent images are
    /// resolved under `<install_dir>/agent`.
    pub install_dir: PathBuf,
    /// Process id of the caller, passed to agents so they can watch it.
    pub caller_pid: u32,
    /// Working directory the agent is started in.
    pub working_dir: PathBuf,
}

impl LaunchContext {
    /// Context for the running process.
    pub fn current() -> std::io::Result<Self> {
        let exe = std::env::current_exe()?;
        let install_dir = exe
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            install_dir,
            caller_pid: std::process::id(),
            working_dir: std::env::current_dir()?,
        })
    }

    pub fn agent_dir(&self) -> PathBuf {
        self.install_dir.join("agent")
    }
}

/// Everything needed to start an agent process. Data only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessDescriptor {
    pub program: PathBuf,
    /// Unescaped argument tokens.
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub create_no_window: bool,
    pub use_shell_execute: bool,
    pub load_user_profile: bool,
}

impl ProcessDescriptor {
    /// The arguments rendered as one command line, each token escaped.
    pub fn argument_string(&self) -> String {
        self.args
            .iter()
            .map(|a| escape_process_argument(a))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Build a `tokio` command for this descriptor. Stdio is left to the
    /// caller.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(&self.working_dir);

        #[cfg(windows)]
        if self.create_no_window {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        cmd
    }
}

/// Capability shared by all launchers.
///
/// Eligibility checks are called speculatively across every registered
/// launcher, so `can_launch` must be a cheap pure predicate.
pub trait AgentLauncher: Send + Sync {
    fn name(&self) -> &str;

    fn target(&self) -> &RuntimeTarget;

    fn can_launch(&self, package: &TestPackage) -> bool;

    /// Build the invocation for `package`.
    ///
    /// Returns `None` when `can_launch` is false; callers are expected to
    /// check first. An absent or empty `agency_url` selects direct mode.
    fn build_invocation(
        &self,
        agent_id: Uuid,
        agency_url: Option<&str>,
        package: &TestPackage,
    ) -> Option<ProcessDescriptor>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_family_and_version_floor() {
        let t = RuntimeTarget::new("netcore", 6);
        assert!(t.matches("netcore-6.0"));
        assert!(t.matches("netcore-3.1"));
        assert!(t.matches("netcore-6"));
        assert!(!t.matches("netcore-7.0"));
        assert!(!t.matches("netcore-10.0"));
        assert!(!t.matches("net-4.8"));
        assert!(!t.matches("mono-6.0"));
    }

    #[test]
    fn short_or_malformed_values_do_not_match() {
        let t = RuntimeTarget::new("netcore", 6);
        assert!(!t.matches(""));
        assert!(!t.matches("net"));
        assert!(!t.matches("netcore"));
        assert!(!t.matches("netcore-"));
        assert!(!t.matches("netcore-x.0"));
        assert!(!t.matches("netcore6.0"));
        assert!(!t.matches("netcore-99999999999999999999"));
    }

    #[test]
    fn argument_string_escapes_each_token() {
        let d = ProcessDescriptor {
            program: PathBuf::from("agent"),
            args: vec!["suite".to_string(), "--work=/tmp/my dir".to_string()],
            working_dir: PathBuf::from("."),
            create_no_window: false,
            use_shell_execute: false,
            load_user_profile: false,
        };
        assert_eq!(d.argument_string(), "suite '--work=/tmp/my dir'");
    }
}
