// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("No file specified for direct execution")]
    NoFileSpecified,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Result document error: {0}")]
    ResultError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Agency process {0} not found")]
    AgencyNotFound(u32),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AgentError>;
