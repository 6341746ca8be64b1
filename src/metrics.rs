use std::collections::BTreeMap;

use crate::models::{EndpointSummary, Measured, ProbeOutcome};

/// Reduces one endpoint's outcomes into its summary.
///
/// Total over any input, including an empty one. Timing fields and the
/// under-threshold count are computed over succeeded outcomes only and are
/// `NotAvailable` when there are none. Order of `outcomes` is irrelevant.
pub fn summarize(
    endpoint: &str,
    outcomes: &[ProbeOutcome],
    proxy: Option<&str>,
    threshold_ms: u64,
) -> EndpointSummary {
    let latencies: Vec<f64> = outcomes
        .iter()
        .filter(|o| o.succeeded())
        .map(|o| o.elapsed_ms)
        .collect();
    let success_count = latencies.len();
    let failure_count = outcomes.len() - success_count;

    if latencies.is_empty() {
        return EndpointSummary {
            endpoint: endpoint.to_string(),
            proxy: proxy.map(String::from),
            avg_ms: Measured::NotAvailable,
            min_ms: Measured::NotAvailable,
            max_ms: Measured::NotAvailable,
            success_count,
            failure_count,
            rps_under_threshold: Measured::NotAvailable,
        };
    }

    let average = latencies.iter().sum::<f64>() / success_count as f64;
    let fastest = latencies.iter().copied().fold(f64::INFINITY, f64::min);
    let slowest = latencies.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let under_threshold = latencies
        .iter()
        .filter(|&&ms| ms <= threshold_ms as f64)
        .count();

    EndpointSummary {
        endpoint: endpoint.to_string(),
        proxy: proxy.map(String::from),
        avg_ms: Measured::Value(round2(average)),
        min_ms: Measured::Value(round2(fastest)),
        max_ms: Measured::Value(round2(slowest)),
        success_count,
        failure_count,
        rps_under_threshold: Measured::Value(under_threshold),
    }
}

/// Failed outcomes tallied by error message, for diagnostics.
pub fn failure_breakdown(outcomes: &[ProbeOutcome]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for message in outcomes.iter().filter_map(ProbeOutcome::error_message) {
        *counts.entry(message).or_insert(0) += 1;
    }
    counts
}

// Halves go to the even neighbour, matching the report format's history.
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProbeFailure;
    use rstest::rstest;

    const URL: &str = "https://rpc.example";

    fn ok(ms: f64) -> ProbeOutcome {
        ProbeOutcome::success(ms, None)
    }

    fn failed(ms: f64, failure: ProbeFailure) -> ProbeOutcome {
        ProbeOutcome::failure(ms, failure, None)
    }

    /// Deterministic mixed outcome sets (xorshift), so the invariants get
    /// exercised over many shapes without a property-testing crate.
    fn generated_batches() -> Vec<Vec<ProbeOutcome>> {
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };
        (0..50)
            .map(|_| {
                let len = (next() % 120) as usize;
                (0..len)
                    .map(|_| {
                        let ms = (next() % 300_000) as f64 / 100.0;
                        match next() % 4 {
                            0 => failed(ms, ProbeFailure::InvalidResult),
                            1 => failed(ms, ProbeFailure::RateLimited),
                            _ => ok(ms),
                        }
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_empty_outcomes() {
        let summary = summarize(URL, &[], None, 1000);
        assert_eq!(summary.success_count, 0);
        assert_eq!(summary.failure_count, 0);
        assert_eq!(summary.avg_ms, Measured::NotAvailable);
        assert_eq!(summary.min_ms, Measured::NotAvailable);
        assert_eq!(summary.max_ms, Measured::NotAvailable);
        assert_eq!(summary.rps_under_threshold, Measured::NotAvailable);
    }

    #[test]
    fn test_all_failed() {
        let outcomes: Vec<_> = (0..100)
            .map(|_| failed(12.0, ProbeFailure::RateLimited))
            .collect();
        let summary = summarize(URL, &outcomes, Some("10.0.0.1:3128"), 1000);
        assert_eq!(summary.success_count, 0);
        assert_eq!(summary.failure_count, 100);
        assert_eq!(summary.proxy.as_deref(), Some("10.0.0.1:3128"));
        assert_eq!(summary.avg_ms, Measured::NotAvailable);
        assert_eq!(summary.rps_under_threshold, Measured::NotAvailable);
    }

    #[test]
    fn test_stats_over_successes_only() {
        let outcomes = vec![
            ok(100.0),
            ok(200.0),
            ok(1500.0),
            failed(1.0, ProbeFailure::InvalidResult),
            failed(9000.0, ProbeFailure::Transport("timed out".into())),
        ];
        let summary = summarize(URL, &outcomes, None, 1000);
        assert_eq!(summary.endpoint, URL);
        assert_eq!(summary.success_count, 3);
        assert_eq!(summary.failure_count, 2);
        assert_eq!(summary.avg_ms, Measured::Value(600.0));
        assert_eq!(summary.min_ms, Measured::Value(100.0));
        assert_eq!(summary.max_ms, Measured::Value(1500.0));
        assert_eq!(summary.rps_under_threshold, Measured::Value(2));
    }

    #[test]
    fn test_measured_zero_is_not_unavailable() {
        let summary = summarize(URL, &[ok(0.0)], None, 1000);
        assert_eq!(summary.min_ms, Measured::Value(0.0));
        assert_eq!(summary.rps_under_threshold, Measured::Value(1));
    }

    #[rstest]
    #[case(&[10.124, 20.456], 15.29, 10.12, 20.46)]
    #[case(&[1.004, 1.004], 1.0, 1.0, 1.0)]
    #[case(&[999.999], 1000.0, 1000.0, 1000.0)]
    #[case(&[0.125], 0.12, 0.12, 0.12)]
    #[case(&[0.375], 0.38, 0.38, 0.38)]
    #[case(&[0.125, 0.375], 0.25, 0.12, 0.38)]
    fn test_rounding_to_two_decimals(
        #[case] latencies: &[f64],
        #[case] avg: f64,
        #[case] min: f64,
        #[case] max: f64,
    ) {
        let outcomes: Vec<_> = latencies.iter().copied().map(ok).collect();
        let summary = summarize(URL, &outcomes, None, 1000);
        assert_eq!(summary.avg_ms, Measured::Value(avg));
        assert_eq!(summary.min_ms, Measured::Value(min));
        assert_eq!(summary.max_ms, Measured::Value(max));
    }

    #[rstest]
    #[case(1000, 2)]
    #[case(999, 1)]
    #[case(100, 0)]
    fn test_threshold_is_inclusive(#[case] threshold_ms: u64, #[case] expected: usize) {
        let outcomes = vec![ok(500.0), ok(1000.0), ok(1000.5)];
        let summary = summarize(URL, &outcomes, None, threshold_ms);
        assert_eq!(summary.rps_under_threshold, Measured::Value(expected));
    }

    #[test]
    fn test_order_independent() {
        let mut outcomes = vec![
            ok(30.0),
            failed(5.0, ProbeFailure::InvalidResult),
            ok(10.0),
            ok(20.0),
        ];
        let forward = summarize(URL, &outcomes, None, 1000);
        outcomes.reverse();
        let backward = summarize(URL, &outcomes, None, 1000);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_invariants_over_generated_batches() {
        for outcomes in generated_batches() {
            let summary = summarize(URL, &outcomes, None, 1000);
            assert_eq!(summary.success_count + summary.failure_count, outcomes.len());

            match (summary.min_ms, summary.avg_ms, summary.max_ms) {
                (Measured::Value(min), Measured::Value(avg), Measured::Value(max)) => {
                    assert!(min <= avg && avg <= max, "{} <= {} <= {}", min, avg, max);
                    let Measured::Value(rps) = summary.rps_under_threshold else {
                        panic!("rps missing despite successes");
                    };
                    assert!(rps <= summary.success_count);
                    let all_fast = outcomes
                        .iter()
                        .filter(|o| o.succeeded())
                        .all(|o| o.elapsed_ms <= 1000.0);
                    if all_fast {
                        assert_eq!(rps, summary.success_count);
                    }
                }
                (min, avg, max) => {
                    assert_eq!(summary.success_count, 0);
                    for stat in [min, avg, max] {
                        assert_eq!(stat, Measured::NotAvailable);
                    }
                    assert_eq!(summary.rps_under_threshold, Measured::NotAvailable);
                }
            }
        }
    }

    #[test]
    fn test_failure_breakdown() {
        let outcomes = vec![
            ok(1.0),
            failed(1.0, ProbeFailure::RateLimited),
            failed(1.0, ProbeFailure::RateLimited),
            failed(1.0, ProbeFailure::InvalidResult),
        ];
        let breakdown = failure_breakdown(&outcomes);
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown["Too Many Requests"], 2);
        assert_eq!(breakdown["Invalid result"], 1);
    }
}
