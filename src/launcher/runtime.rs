// src/launcher/runtime.rs

//! Launcher for one agent image bound to one runtime target.

use std::path::PathBuf;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::launcher::{AgentLauncher, LaunchContext, ProcessDescriptor, RuntimeTarget};
use crate::package::{TestPackage, settings};

/// Launches `<install_dir>/agent/<agent_file>` for packages targeting a
/// runtime no newer than its [`RuntimeTarget`].
///
/// With a host program configured (e.g. a runtime's own launcher), the host
/// becomes the executable and the agent image its first argument.
#[derive(Debug, Clone)]
pub struct RuntimeAgentLauncher {
    name: String,
    target: RuntimeTarget,
    agent_file: String,
    host: Option<String>,
    context: LaunchContext,
}

impl RuntimeAgentLauncher {
    pub fn new(
        name: impl Into<String>,
        target: RuntimeTarget,
        agent_file: impl Into<String>,
        context: LaunchContext,
    ) -> Self {
        Self {
            name: name.into(),
            target,
            agent_file: agent_file.into(),
            host: None,
            context,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Absolute location of the agent image, independent of the caller's
    /// current directory.
    pub fn agent_path(&self) -> PathBuf {
        self.context.agent_dir().join(&self.agent_file)
    }
}

impl AgentLauncher for RuntimeAgentLauncher {
    fn name(&self) -> &str {
        &self.name
    }

    fn target(&self) -> &RuntimeTarget {
        &self.target
    }

    fn can_launch(&self, package: &TestPackage) -> bool {
        let runtime = package.get_str(settings::TARGET_RUNTIME_FRAMEWORK, "");
        self.target.matches(runtime)
    }

    fn build_invocation(
        &self,
        agent_id: Uuid,
        agency_url: Option<&str>,
        package: &TestPackage,
    ) -> Option<ProcessDescriptor> {
        if !self.can_launch(package) {
            warn!(
                launcher = %self.name,
                package = %package.full_name().display(),
                "build_invocation called for a package this launcher cannot run"
            );
            return None;
        }

        let agency_url = agency_url.filter(|url| !url.is_empty());
        let run_under_agency = agency_url.is_some();

        let mut args = Vec::new();
        if let Some(host) = &self.host {
            debug!(launcher = %self.name, host = %host, "agent started through host program");
            args.push(self.agent_path().to_string_lossy().into_owned());
        }

        match agency_url {
            Some(url) => {
                args.push(format!("--agentId={agent_id}"));
                args.push(format!("--agencyUrl={url}"));
                args.push(format!("--pid={}", self.context.caller_pid));
            }
            None => {
                args.push(package.full_name().to_string_lossy().into_owned());
            }
        }

        // Options that must be in effect before the package is loaded.
        let trace_level = package.get_str(settings::INTERNAL_TRACE_LEVEL, "Off");
        let debug_agent = package.get_bool(settings::DEBUG_AGENT, false);
        let work_directory = package.get_str(settings::WORK_DIRECTORY, "");
        let load_user_profile = package.get_bool(settings::LOAD_USER_PROFILE, false);

        if trace_level != "Off" {
            args.push(format!("--trace={trace_level}"));
        }
        if debug_agent {
            args.push("--debug-agent".to_string());
        }
        if !work_directory.is_empty() {
            args.push(format!("--work={work_directory}"));
        }

        let program = match &self.host {
            Some(host) => PathBuf::from(host),
            None => self.agent_path(),
        };

        Some(ProcessDescriptor {
            program,
            args,
            working_dir: self.context.working_dir.clone(),
            create_no_window: run_under_agency,
            use_shell_execute: false,
            load_user_profile,
        })
    }
}
