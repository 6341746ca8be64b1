//! Output of a finished run: a JSON lines file and a colored console table.

use colored::Colorize;
use std::fs;
use std::path::Path;
use tabled::settings::{Alignment, Style};
use tabled::{Table, Tabled};

use crate::error::{BenchError, Result};
use crate::models::{EndpointSummary, Measured};

const FAST_AVG_MS: f64 = 100.0;
const FAST_EXTREMA_MS: f64 = 200.0;

/// One compact JSON object per summary, newline separated, no trailing newline.
pub fn to_json_lines(summaries: &[EndpointSummary]) -> Result<String> {
    let lines = summaries
        .iter()
        .map(serde_json::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}

pub fn write_json_lines(path: &Path, summaries: &[EndpointSummary]) -> Result<()> {
    let contents = to_json_lines(summaries)?;
    fs::write(path, contents).map_err(|e| BenchError::io(path, e))
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "RPC URL")]
    rpc_url: String,
    #[tabled(rename = "Proxy")]
    proxy: String,
    #[tabled(rename = "Avg Response Time (ms)")]
    avg: String,
    #[tabled(rename = "Min Response Time (ms)")]
    min: String,
    #[tabled(rename = "Max Response Time (ms)")]
    max: String,
    #[tabled(rename = "Successful Responses")]
    successes: String,
    #[tabled(rename = "Error Responses")]
    errors: String,
    #[tabled(rename = "RPS")]
    rps: String,
}

impl From<&EndpointSummary> for SummaryRow {
    fn from(summary: &EndpointSummary) -> Self {
        Self {
            rpc_url: summary.endpoint.cyan().to_string(),
            proxy: match &summary.proxy {
                Some(proxy) => proxy.yellow().to_string(),
                None => "None".dimmed().to_string(),
            },
            avg: latency_cell(&summary.avg_ms, FAST_AVG_MS),
            min: latency_cell(&summary.min_ms, FAST_EXTREMA_MS),
            max: latency_cell(&summary.max_ms, FAST_EXTREMA_MS),
            successes: summary.success_count.to_string().green().to_string(),
            errors: summary.failure_count.to_string().red().to_string(),
            rps: summary.rps_under_threshold.to_string().green().to_string(),
        }
    }
}

// Green only for a measured value under the bound; "N/A" is always red.
fn latency_cell(value: &Measured<f64>, fast_below_ms: f64) -> String {
    match value {
        Measured::Value(ms) if *ms < fast_below_ms => ms.to_string().green().to_string(),
        other => other.to_string().red().to_string(),
    }
}

pub fn render_table(summaries: &[EndpointSummary]) -> String {
    let rows: Vec<SummaryRow> = summaries.iter().map(SummaryRow::from).collect();
    Table::new(rows)
        .with(Style::ascii())
        .with(Alignment::center())
        .to_string()
}
