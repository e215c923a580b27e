// src/launcher/registry.rs

//! Ordered launcher list, selected by first match.

use std::fmt;

use tracing::debug;
use uuid::Uuid;

use crate::launcher::{
    AgentLauncher, LaunchContext, ProcessDescriptor, RuntimeAgentLauncher, RuntimeTarget,
};
use crate::package::{TestPackage, settings};

/// Launchers tried in registration order; the first eligible one wins.
#[derive(Default)]
pub struct LauncherRegistry {
    launchers: Vec<Box<dyn AgentLauncher>>,
}

impl fmt::Debug for LauncherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LauncherRegistry")
            .field("launchers", &self.names())
            .finish()
    }
}

impl LauncherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock launchers, narrowest target first so the oldest agent able
    /// to host a package is preferred.
    pub fn default_for(context: &LaunchContext) -> Self {
        let native = format!("testagent{}", std::env::consts::EXE_SUFFIX);

        Self::new()
            .with(
                RuntimeAgentLauncher::new(
                    "net60-agent",
                    RuntimeTarget::new("netcore", 6),
                    "net60-agent.dll",
                    context.clone(),
                )
                .with_host("dotnet"),
            )
            .with(
                RuntimeAgentLauncher::new(
                    "net80-agent",
                    RuntimeTarget::new("netcore", 8),
                    "net80-agent.dll",
                    context.clone(),
                )
                .with_host("dotnet"),
            )
            .with(RuntimeAgentLauncher::new(
                "native-agent",
                RuntimeTarget::new("native", 1),
                native,
                context.clone(),
            ))
    }

    pub fn with(mut self, launcher: impl AgentLauncher + 'static) -> Self {
        self.register(Box::new(launcher));
        self
    }

    pub fn register(&mut self, launcher: Box<dyn AgentLauncher>) {
        self.launchers.push(launcher);
    }

    pub fn names(&self) -> Vec<&str> {
        self.launchers.iter().map(|l| l.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.launchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.launchers.is_empty()
    }

    /// First launcher able to run `package`.
    pub fn select(&self, package: &TestPackage) -> Option<&dyn AgentLauncher> {
        let selected = self
            .launchers
            .iter()
            .find(|l| l.can_launch(package))
            .map(|l| &**l);

        debug!(
            runtime = package.get_str(settings::TARGET_RUNTIME_FRAMEWORK, ""),
            launcher = selected.map(|l| l.name()),
            "launcher selection"
        );

        selected
    }

    /// Build an invocation with the first eligible launcher.
    pub fn build_invocation(
        &self,
        agent_id: Uuid,
        agency_url: Option<&str>,
        package: &TestPackage,
    ) -> Option<ProcessDescriptor> {
        self.select(package)?
            .build_invocation(agent_id, agency_url, package)
    }
}
