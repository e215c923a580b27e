// src/bin/launch.rs

use anyhow::{Context, anyhow};
use clap::Parser;
use tracing::{debug, info};
use uuid::Uuid;

use testagent::cli::LaunchArgs;
use testagent::launcher::{LaunchContext, LauncherRegistry, ProcessDescriptor, spawn_and_wait};
use testagent::logging;
use testagent::package::{load_package, settings};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("testagent-launch error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<i32> {
    let args = LaunchArgs::parse();
    logging::init_launcher_logging(args.log_level)?;

    let package = load_package(&args.package)
        .with_context(|| format!("loading package {:?}", args.package))?;
    let context = LaunchContext::current().context("inspecting the launcher process")?;
    let registry = LauncherRegistry::default_for(&context);
    debug!(launchers = ?registry.names(), "launcher registry ready");

    let launcher = registry.select(&package).ok_or_else(|| {
        anyhow!(
            "no agent launcher can run {} (TargetRuntimeFramework = {:?})",
            package.full_name().display(),
            package.get_str(settings::TARGET_RUNTIME_FRAMEWORK, "")
        )
    })?;

    let agent_id = args.agent_id.unwrap_or_else(Uuid::new_v4);
    let agency_url = args.agency_url.as_deref().filter(|url| !url.is_empty());

    let descriptor = launcher
        .build_invocation(agent_id, agency_url, &package)
        .ok_or_else(|| anyhow!("launcher {} declined the package", launcher.name()))?;
    info!(launcher = launcher.name(), %agent_id, "invocation built");

    if args.dry_run {
        print_dry_run(launcher.name(), &descriptor);
        return Ok(0);
    }

    let termination = spawn_and_wait(&descriptor).await?;
    println!("agent exited: {termination}");
    Ok(termination.process_exit_code())
}

fn print_dry_run(launcher: &str, descriptor: &ProcessDescriptor) {
    println!("testagent-launch dry-run");
    println!("  launcher: {launcher}");
    println!("  program: {}", descriptor.program.display());
    println!("  arguments: {}", descriptor.argument_string());
    println!("  working dir: {}", descriptor.working_dir.display());
    println!("  create_no_window: {}", descriptor.create_no_window);
    println!("  load_user_profile: {}", descriptor.load_user_profile);
}
