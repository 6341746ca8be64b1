use crate::error::{BenchError, Result};
use crate::models::ProxyAggregation;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "bench.toml";

/// Upper bound on probes per batch; each probe is a spawned task and a socket.
pub const MAX_BURST_SIZE: usize = 10_000;

/// Knobs shared by the burst runner and the aggregator for one run.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BenchConfig {
    /// Probes per (endpoint, proxy) pair
    pub burst_size: usize,
    /// Latency bound for the under-threshold counter
    pub threshold_ms: u64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub proxy_aggregation: ProxyAggregation,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            burst_size: 100,
            threshold_ms: 1000,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            proxy_aggregation: ProxyAggregation::AllBatches,
        }
    }
}

impl BenchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.burst_size == 0 {
            return Err(BenchError::InvalidConfig(
                "burst_size must be at least 1".to_string(),
            ));
        }
        if self.burst_size > MAX_BURST_SIZE {
            return Err(BenchError::InvalidConfig(format!(
                "burst_size {} exceeds the maximum of {}",
                self.burst_size, MAX_BURST_SIZE
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FilesConfig {
    /// One endpoint URL per line
    pub rpc: PathBuf,
    /// One `host:port` per line
    pub proxy: PathBuf,
    /// JSON lines report
    pub output: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            rpc: PathBuf::from("rpc.txt"),
            proxy: PathBuf::from("proxy.txt"),
            output: PathBuf::from("results.json"),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub bench: BenchConfig,
    pub files: FilesConfig,
}

/// Loads the TOML config at `path`.
///
/// When `required` is false a missing file yields the defaults, so the tool
/// runs out of the box with just `rpc.txt` next to it.
pub fn load_config(path: &Path, required: bool) -> Result<AppConfig> {
    let config_str = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(AppConfig::default());
        }
        Err(e) => return Err(BenchError::io(path, e)),
    };
    let config: AppConfig = toml::from_str(&config_str)?;
    Ok(config)
}

/// Reads a list file: one entry per line, trimmed, blank lines skipped.
pub fn read_list(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}
