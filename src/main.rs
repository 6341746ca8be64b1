mod burst;
mod config;
mod error;
mod metrics;
mod models;
mod report;
mod rpc;
#[cfg(test)]
mod testing;

use clap::Parser;
use colored::Colorize;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::burst::{benchmark_all, BurstRunner};
use crate::config::{load_config, read_list, AppConfig, DEFAULT_CONFIG_PATH};
use crate::models::{ProxyAggregation, RunMode};
use crate::report::{render_table, write_json_lines};

/// CLI arguments
#[derive(Parser, Debug)]
#[command(
    name = "rpc-burst-bench",
    version,
    about = "Burst latency and success-rate benchmark for EVM JSON-RPC endpoints"
)]
struct Cli {
    /// Benchmark mode; prompts interactively when omitted
    #[arg(long, value_enum)]
    mode: Option<RunMode>,

    /// Path to the TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// File with one RPC URL per line
    #[arg(long)]
    rpc_file: Option<PathBuf>,

    /// File with one proxy `host:port` per line
    #[arg(long)]
    proxy_file: Option<PathBuf>,

    /// JSON lines report path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Probes per endpoint (and per proxy)
    #[arg(long)]
    burst_size: Option<usize>,

    /// Latency bound in ms for the RPS column
    #[arg(long)]
    threshold_ms: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Which proxy batches feed the summary
    #[arg(long, value_enum)]
    proxy_aggregation: Option<ProxyAggregation>,
}

impl Cli {
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(path) = &self.rpc_file {
            config.files.rpc = path.clone();
        }
        if let Some(path) = &self.proxy_file {
            config.files.proxy = path.clone();
        }
        if let Some(path) = &self.output {
            config.files.output = path.clone();
        }
        if let Some(size) = self.burst_size {
            config.bench.burst_size = size;
        }
        if let Some(threshold) = self.threshold_ms {
            config.bench.threshold_ms = threshold;
        }
        if let Some(timeout) = self.timeout_secs {
            config.bench.request_timeout_secs = timeout;
        }
        if let Some(aggregation) = self.proxy_aggregation {
            config.bench.proxy_aggregation = aggregation;
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn prompt_mode() -> io::Result<Option<RunMode>> {
    println!("Select an option:");
    println!("1. RPC Benchmark");
    println!("2. RPC Benchmark with Proxy");
    print!("Enter choice: ");
    io::stdout().flush()?;

    let mut choice = String::new();
    io::stdin().read_line(&mut choice)?;
    println!("\n");
    Ok(RunMode::from_menu_choice(&choice))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Cli::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut config = load_config(&config_path, args.config.is_some())?;

    // Override TOML config with CLI arguments
    args.apply_to(&mut config);
    config.bench.validate()?;

    println!("{}", "RPC BURST BENCH".magenta().bold());
    let mode = match args.mode {
        Some(mode) => mode,
        None => match prompt_mode()? {
            Some(mode) => mode,
            None => {
                println!("{}", "Invalid choice".yellow());
                return Ok(());
            }
        },
    };

    let endpoints = read_list(&config.files.rpc)?;
    let proxies = match mode {
        RunMode::Plain => Vec::new(),
        RunMode::Proxy => read_list(&config.files.proxy)?,
    };

    if endpoints.is_empty() {
        tracing::warn!("No endpoints in {}", config.files.rpc.display());
    }
    if mode == RunMode::Proxy && proxies.is_empty() {
        tracing::warn!(
            "No proxies in {}, running unproxied",
            config.files.proxy.display()
        );
    }
    tracing::info!(
        "Benchmarking {} endpoint(s) via {} proxy(ies), {} probes per batch",
        endpoints.len(),
        proxies.len(),
        config.bench.burst_size
    );

    let runner = BurstRunner::new(config.bench.clone());
    let summaries = benchmark_all(&runner, &endpoints, &proxies).await;

    write_json_lines(&config.files.output, &summaries)?;
    println!("{}", render_table(&summaries));

    Ok(())
}
