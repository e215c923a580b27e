// src/logging.rs

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! The agent logs to a per-process file, `testagent_<pid>.log`, in its work
//! directory. Priority for determining the trace level:
//! 1. `--trace` CLI flag (if provided)
//! 2. `TESTAGENT_TRACE` environment variable (e.g. "Info", "Debug")
//! 3. default to `Off`
//!
//! The launcher tool logs to STDERR instead, like any other CLI.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::fmt;

use crate::cli::{LogLevel, TraceLevel};

/// Resolve the effective trace level for the agent process.
pub fn resolve_trace_level(cli_level: Option<TraceLevel>) -> TraceLevel {
    cli_level
        .or_else(|| {
            std::env::var("TESTAGENT_TRACE")
                .ok()
                .and_then(|s| TraceLevel::parse(&s))
        })
        .unwrap_or(TraceLevel::Off)
}

/// Name of the log file for the given agent process.
pub fn log_file_name(pid: u32) -> String {
    format!("testagent_{pid}.log")
}

/// Initialise the agent's process-wide log file.
///
/// Returns the log path, or `None` when tracing is off. Safe to call more
/// than once; only the first subscriber is installed.
pub fn init_agent_logging(
    work_dir: &Path,
    pid: u32,
    level: TraceLevel,
) -> Result<Option<PathBuf>> {
    let Some(max_level) = level.as_tracing_level() else {
        return Ok(None);
    };

    fs::create_dir_all(work_dir)
        .with_context(|| format!("creating work directory {:?}", work_dir))?;

    let path = work_dir.join(log_file_name(pid));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {:?}", path))?;

    let _ = fmt()
        .with_max_level(max_level)
        .with_target(true)
        .with_ansi(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(Mutex::new(file))
        .try_init();

    Ok(Some(path))
}

/// Initialise stderr logging for `testagent-launch`.
pub fn init_launcher_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => std::env::var("TESTAGENT_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(tracing::Level::INFO),
    };

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
