// src/lib.rs

pub mod agent;
pub mod cli;
pub mod errors;
pub mod exit_code;
pub mod launcher;
pub mod logging;
pub mod package;
pub mod results;
pub mod runner;

use tracing::info;

use crate::agent::{AgentContext, Collaborators, LifecycleController};
use crate::cli::AgentOptions;
use crate::errors::Result;
use crate::exit_code::AgentExitCode;

/// High-level entry point used by `main.rs`.
///
/// Wires the production collaborators (TCP transport, OS process table,
/// platform debugger, command engine) into a [`LifecycleController`] and
/// runs it to completion.
pub async fn run(context: AgentContext, options: AgentOptions) -> Result<AgentExitCode> {
    let collaborators = Collaborators::system(&context);
    let mut controller = LifecycleController::new(context, options, collaborators);

    let code = controller.run().await?;
    info!(exit = %code, state = ?controller.state(), "agent finished");
    Ok(code)
}
