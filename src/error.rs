//! Error types for rpc-burst-bench
//!
//! Only run-level problems live here. A probe that fails is recorded as a
//! [`crate::models::ProbeOutcome`], never as a [`BenchError`].

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    /// Reading or writing a file failed
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML config file could not be parsed
    #[error("Config file parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A config value is out of range
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Summary serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The HTTP client (or its proxy) could not be built
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl BenchError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BenchError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
