use crate::config::BenchConfig;
use crate::error::Result;
use crate::models::{ProbeFailure, ProbeOutcome};
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::error::Error as StdError;
use std::time::{Duration, Instant};

const USER_AGENT: &str = "rpc-burst-bench/0.1";

/// Body marker of a throttled response.
pub const RATE_LIMIT_MARKER: &str = "Too Many Requests";
/// Body marker of a successful hex-encoded `eth_call` result.
pub const SUCCESS_MARKER: &str = r#"result":"0x"#;

#[derive(Debug, Clone, Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    method: &'static str,
    params: Value,
    id: u64,
}

// DAI balanceOf() with a state override funding a throwaway address, so the
// node has to execute the call instead of answering from cache.
static PROBE_REQUEST: Lazy<JsonRpcRequest> = Lazy::new(|| JsonRpcRequest {
    jsonrpc: "2.0",
    method: "eth_call",
    params: json!([
        {
            "from": null,
            "to": "0x6b175474e89094c44da98b954eedeac495271d0f",
            "data": "0x70a082310000000000000000000000006E0d01A76C3Cf4288372a29124A26D4353EE51BE"
        },
        "latest",
        {
            "0x1111111111111111111111111111111111111111": {
                "balance": "0xFFFFFFFFFFFFFFFFFFFF"
            }
        }
    ]),
    id: 1,
});

/// Builds the client shared by every probe of one batch.
///
/// With a proxy, all traffic goes through `http://host:port`. Without one,
/// environment proxies are ignored so direct runs really are direct.
pub fn build_client(proxy: Option<&str>, config: &BenchConfig) -> Result<Client> {
    let builder = reqwest::ClientBuilder::new()
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(config.request_timeout())
        .connect_timeout(config.connect_timeout())
        .tcp_keepalive(Duration::from_secs(30))
        .user_agent(USER_AGENT);

    let builder = match proxy {
        Some(addr) => builder.proxy(reqwest::Proxy::all(format!("http://{}", addr))?),
        None => builder.no_proxy(),
    };

    Ok(builder.build()?)
}

/// Applies the fixed content rule to a raw response body.
pub fn classify(body: &str) -> std::result::Result<(), ProbeFailure> {
    if body.contains(RATE_LIMIT_MARKER) {
        Err(ProbeFailure::RateLimited)
    } else if body.contains(SUCCESS_MARKER) {
        Ok(())
    } else {
        Err(ProbeFailure::InvalidResult)
    }
}

/// Sends one probe and times it. Never fails: every error becomes an outcome.
pub async fn probe(client: &Client, endpoint: &str, proxy: Option<&str>) -> ProbeOutcome {
    let start = Instant::now();
    let response = send_probe(client, endpoint).await;
    let elapsed_ms = elapsed_ms(start);
    let proxy = proxy.map(String::from);

    let status = match response {
        Ok(body) => classify(&body),
        Err(e) => Err(ProbeFailure::Transport(describe(&e))),
    };

    match status {
        Ok(()) => ProbeOutcome::success(elapsed_ms, proxy),
        Err(failure) => ProbeOutcome::failure(elapsed_ms, failure, proxy),
    }
}

async fn send_probe(client: &Client, endpoint: &str) -> reqwest::Result<String> {
    client
        .post(endpoint)
        .json(&*PROBE_REQUEST)
        .send()
        .await?
        .text()
        .await
}

pub fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Flattens an error and its sources into one line.
///
/// reqwest's top-level message is just "error sending request"; the cause
/// (refused, DNS, TLS, proxy) sits further down the chain.
fn describe(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
