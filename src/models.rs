use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Rendered in place of a statistic that could not be measured.
pub const NOT_AVAILABLE: &str = "N/A";

/// A statistic that is only defined when at least one probe succeeded.
///
/// Serializes as the bare value, or as the string `"N/A"` when unavailable, so
/// "no data" is never confused with a measured zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measured<T> {
    Value(T),
    NotAvailable,
}

impl<T: Serialize> Serialize for Measured<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Measured::Value(v) => v.serialize(serializer),
            Measured::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Measured<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measured::Value(v) => write!(f, "{}", v),
            Measured::NotAvailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

/// Why a single probe did not count as a success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// Connect, TLS, DNS, timeout, proxy or body read failure
    #[error("{0}")]
    Transport(String),

    /// Response body signalled throttling
    #[error("Too Many Requests")]
    RateLimited,

    /// Response body lacked the expected hex result
    #[error("Invalid result")]
    InvalidResult,

    /// The probe task itself died before producing an outcome
    #[error("probe task failed: {0}")]
    Aborted(String),
}

/// The record of one probe: timing, proxy used, and success or failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub elapsed_ms: f64,
    pub proxy: Option<String>,
    pub status: Result<(), ProbeFailure>,
}

impl ProbeOutcome {
    pub fn success(elapsed_ms: f64, proxy: Option<String>) -> Self {
        Self {
            elapsed_ms,
            proxy,
            status: Ok(()),
        }
    }

    pub fn failure(elapsed_ms: f64, failure: ProbeFailure, proxy: Option<String>) -> Self {
        Self {
            elapsed_ms,
            proxy,
            status: Err(failure),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status.is_ok()
    }

    pub fn error_message(&self) -> Option<String> {
        self.status.as_ref().err().map(|e| e.to_string())
    }
}

/// Per-endpoint statistics, one line of the JSON report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointSummary {
    #[serde(rename = "rpc_url")]
    pub endpoint: String,
    pub proxy: Option<String>,
    #[serde(rename = "avg_response_time")]
    pub avg_ms: Measured<f64>,
    #[serde(rename = "min_response_time")]
    pub min_ms: Measured<f64>,
    #[serde(rename = "max_response_time")]
    pub max_ms: Measured<f64>,
    #[serde(rename = "successful_responses")]
    pub success_count: usize,
    #[serde(rename = "error_responses")]
    pub failure_count: usize,
    #[serde(rename = "rps")]
    pub rps_under_threshold: Measured<usize>,
}

/// Which outcomes feed the summary when an endpoint is run through several proxies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ProxyAggregation {
    /// Reduce over every proxy's batch
    #[default]
    AllBatches,
    /// Reduce over the final proxy's batch only
    LastBatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RunMode {
    /// Benchmark every endpoint directly
    Plain,
    /// Benchmark every endpoint once per proxy
    Proxy,
}

impl RunMode {
    /// Maps an interactive menu answer to a mode.
    pub fn from_menu_choice(choice: &str) -> Option<Self> {
        match choice.trim() {
            "1" => Some(RunMode::Plain),
            "2" => Some(RunMode::Proxy),
            _ => None,
        }
    }
}
