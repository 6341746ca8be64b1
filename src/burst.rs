use chrono::{DateTime, Utc};
use colored::Colorize;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task;

use crate::config::BenchConfig;
use crate::metrics::{failure_breakdown, summarize};
use crate::models::{
    EndpointSummary, Measured, ProbeFailure, ProbeOutcome, ProxyAggregation, NOT_AVAILABLE,
};
use crate::rpc;

/// Fires fixed-size bursts of concurrent probes at one endpoint.
#[derive(Debug, Clone)]
pub struct BurstRunner {
    config: BenchConfig,
}

impl BurstRunner {
    pub fn new(config: BenchConfig) -> Self {
        Self { config }
    }

    /// Runs every batch for `endpoint` and returns the outcomes to aggregate.
    ///
    /// With no proxies this is one direct batch. Otherwise each proxy gets a
    /// full batch of its own, one proxy after another; which of those batches
    /// are returned follows [`ProxyAggregation`].
    pub async fn run(&self, endpoint: &str, proxies: &[String]) -> Vec<ProbeOutcome> {
        if proxies.is_empty() {
            return self.run_via(endpoint, None).await;
        }

        let mut outcomes = Vec::with_capacity(self.outcome_capacity(proxies.len()));
        for proxy in proxies {
            let batch = self.run_via(endpoint, Some(proxy)).await;
            match self.config.proxy_aggregation {
                ProxyAggregation::AllBatches => outcomes.extend(batch),
                ProxyAggregation::LastBatch => outcomes = batch,
            }
        }
        outcomes
    }

    fn outcome_capacity(&self, proxy_count: usize) -> usize {
        self.config.burst_size.saturating_mul(proxy_count)
    }

    /// Runs the bursts for `endpoint` and reduces them to its summary,
    /// attributed to the first proxy.
    pub async fn benchmark(&self, endpoint: &str, proxies: &[String]) -> EndpointSummary {
        let outcomes = self.run(endpoint, proxies).await;

        let failures = failure_breakdown(&outcomes);
        if !failures.is_empty() {
            tracing::debug!("[{}] failures by reason: {:?}", endpoint, failures);
        }

        summarize(
            endpoint,
            &outcomes,
            proxies.first().map(String::as_str),
            self.config.threshold_ms,
        )
    }

    /// One batch against `endpoint`, sharing a single client (and its
    /// connection pool) between all probes.
    async fn run_via(&self, endpoint: &str, proxy: Option<&str>) -> Vec<ProbeOutcome> {
        let client = match rpc::build_client(proxy, &self.config) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("[{}] unusable proxy {:?}: {}", endpoint, proxy, e);
                let failure = ProbeFailure::Transport(e.to_string());
                return (0..self.config.burst_size)
                    .map(|_| ProbeOutcome::failure(0.0, failure.clone(), proxy.map(String::from)))
                    .collect();
            }
        };

        let endpoint: Arc<str> = Arc::from(endpoint);
        let proxy: Option<Arc<str>> = proxy.map(Arc::from);
        let label = proxy.as_deref().map(String::from);

        self.run_batch(label, move || {
            let client = client.clone();
            let endpoint = endpoint.clone();
            let proxy = proxy.clone();
            async move { rpc::probe(&client, &endpoint, proxy.as_deref()).await }
        })
        .await
    }

    /// Spawns `burst_size` probes from `make_probe` at once and waits for all
    /// of them to settle.
    ///
    /// A probe task that dies is recorded as a [`ProbeFailure::Aborted`]
    /// outcome, so the result always holds exactly `burst_size` outcomes.
    pub async fn run_batch<F, Fut>(&self, proxy: Option<String>, make_probe: F) -> Vec<ProbeOutcome>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ProbeOutcome> + Send + 'static,
    {
        let start = Instant::now();
        let tasks: Vec<_> = (0..self.config.burst_size)
            .map(|_| task::spawn(make_probe()))
            .collect();

        let outcomes: Vec<ProbeOutcome> = join_all(tasks)
            .await
            .into_iter()
            .map(|joined| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Probe task failed: {}", e);
                    ProbeOutcome::failure(
                        rpc::elapsed_ms(start),
                        ProbeFailure::Aborted(e.to_string()),
                        proxy.clone(),
                    )
                }
            })
            .collect();

        tracing::debug!(
            "Batch via {} settled: {} probes in {:.0}ms",
            proxy.as_deref().unwrap_or("direct"),
            outcomes.len(),
            rpc::elapsed_ms(start)
        );
        outcomes
    }
}

/// Benchmarks each endpoint in turn, one full burst set at a time.
pub async fn benchmark_all(
    runner: &BurstRunner,
    endpoints: &[String],
    proxies: &[String],
) -> Vec<EndpointSummary> {
    let runner = runner.clone();
    let proxies: Arc<[String]> = Arc::from(proxies);

    run_endpoints(endpoints, move |url| {
        let runner = runner.clone();
        let proxies = proxies.clone();
        async move { runner.benchmark(&url, &proxies).await }
    })
    .await
}

/// Drives `bench` over `endpoints` sequentially, in order.
///
/// Every endpoint runs as its own task; if that task dies the endpoint is
/// logged, left out of the report, and the next one still runs.
pub async fn run_endpoints<F, Fut>(endpoints: &[String], bench: F) -> Vec<EndpointSummary>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = EndpointSummary> + Send + 'static,
{
    let mut summaries = Vec::with_capacity(endpoints.len());

    for endpoint in endpoints {
        println!(
            "{}",
            format!("BENCHMARK | Sending requests to RPC: {}", endpoint).magenta()
        );

        match task::spawn(bench(endpoint.clone())).await {
            Ok(summary) => {
                println!("{}", progress_line(&summary, Utc::now()));
                summaries.push(summary);
            }
            Err(e) => {
                tracing::error!("Error while benchmarking {}: {}", endpoint, e);
                eprintln!("{}", format!("Error while benchmarking {}: {}", endpoint, e).red());
            }
        }
    }

    summaries
}

fn progress_line(summary: &EndpointSummary, at: DateTime<Utc>) -> String {
    let avg = match summary.avg_ms {
        Measured::Value(ms) => format!("{}ms", ms),
        Measured::NotAvailable => NOT_AVAILABLE.to_string(),
    };
    format!(
        "[{}] [{}] {} ok / {} failed, avg={}",
        at.to_rfc3339(),
        summary.endpoint,
        summary.success_count,
        summary.failure_count,
        avg
    )
}
