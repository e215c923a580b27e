// src/main.rs

use testagent::agent::AgentContext;
use testagent::{cli, logging, run};

#[tokio::main]
async fn main() {
    let options = cli::parse();
    let context = AgentContext::current();

    let level = logging::resolve_trace_level(options.trace);
    if let Err(err) = logging::init_agent_logging(&options.work_directory(), context.pid, level) {
        eprintln!("testagent: unable to open log file: {err:?}");
    }

    match run(context, options).await {
        Ok(code) => std::process::exit(code.code()),
        Err(err) => {
            eprintln!("testagent error: {err}");
            std::process::exit(1);
        }
    }
}
