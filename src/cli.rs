// src/cli.rs

//! Command-line parsing using `clap`.
//!
//! Two surfaces live here:
//! - [`AgentOptions`]: what the agent process accepts. The flag spellings
//!   (`--agentId`, `--agencyUrl`, `--pid`, ...) are what launchers emit, so
//!   they are part of the contract with the agency.
//! - [`LaunchArgs`]: the `testagent-launch` tool.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use uuid::Uuid;

/// Options the agent process is started with.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "testagent",
    version,
    about = "Test agent: runs a test package directly or on behalf of an agency.",
    long_about = None
)]
pub struct AgentOptions {
    /// Identity assigned to this agent by the agency.
    #[arg(long = "agentId", value_name = "ID", default_value_t = Uuid::nil())]
    pub agent_id: Uuid,

    /// Address of the agency to register with. Absent or empty means
    /// direct mode.
    #[arg(long = "agencyUrl", value_name = "URL")]
    pub agency_url: Option<String>,

    /// Process id of the agency, used to detect its death.
    #[arg(long = "pid", value_name = "PID")]
    pub agency_pid: Option<u32>,

    /// Directory for the log file and result document.
    ///
    /// Default: the current working directory.
    #[arg(long = "work", value_name = "PATH")]
    pub work: Option<PathBuf>,

    /// Internal trace level (Off, Error, Warning, Info, Verbose, Debug).
    ///
    /// If omitted, `TESTAGENT_TRACE` or `Off` is used.
    #[arg(long = "trace", value_enum, ignore_case = true, value_name = "LEVEL")]
    pub trace: Option<TraceLevel>,

    /// Ask for a debugger to be attached to the agent itself.
    #[arg(long = "debug-agent")]
    pub debug_agent: bool,

    /// Ask for a debugger to be attached before tests run.
    #[arg(long = "debug-tests")]
    pub debug_tests: bool,

    /// Test package file(s) for direct execution.
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

impl AgentOptions {
    /// The agency address, with an empty string treated as absent.
    pub fn agency_url(&self) -> Option<&str> {
        self.agency_url.as_deref().filter(|url| !url.is_empty())
    }

    pub fn work_directory(&self) -> PathBuf {
        match &self.work {
            Some(dir) if !dir.as_os_str().is_empty() => dir.clone(),
            _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    pub fn wants_debugger(&self) -> bool {
        self.debug_agent || self.debug_tests
    }
}

/// Internal trace level, spelled the way agencies pass it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum TraceLevel {
    Off,
    Error,
    Warning,
    Info,
    Verbose,
    Debug,
}

impl TraceLevel {
    /// Parse a level name, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        <TraceLevel as ValueEnum>::from_str(s.trim(), true).ok()
    }

    /// Maximum `tracing` level, or `None` when tracing is off.
    pub fn as_tracing_level(self) -> Option<tracing::Level> {
        match self {
            TraceLevel::Off => None,
            TraceLevel::Error => Some(tracing::Level::ERROR),
            TraceLevel::Warning => Some(tracing::Level::WARN),
            TraceLevel::Info => Some(tracing::Level::INFO),
            TraceLevel::Verbose => Some(tracing::Level::DEBUG),
            TraceLevel::Debug => Some(tracing::Level::TRACE),
        }
    }
}

/// Command-line arguments for `testagent-launch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "testagent-launch",
    version,
    about = "Pick an agent launcher for a test package and start the agent.",
    long_about = None
)]
pub struct LaunchArgs {
    /// Path to the package description (TOML).
    #[arg(long, value_name = "PATH", default_value = "TestPackage.toml")]
    pub package: PathBuf,

    /// Agency address to hand to the agent. Omit for direct mode.
    #[arg(long, value_name = "URL")]
    pub agency_url: Option<String>,

    /// Agent identity. A random one is generated if omitted.
    #[arg(long, value_name = "ID")]
    pub agent_id: Option<Uuid>,

    /// Print the process invocation, but don't start it.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TESTAGENT_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the launcher CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `AgentOptions::parse()`.
pub fn parse() -> AgentOptions {
    AgentOptions::parse()
}
