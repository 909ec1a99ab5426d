use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::observation::{millis, throughput_kb_s, Observation};

/// Running statistics for one protocol label.
///
/// Only sums, extrema, and counts are stored; averages and throughput are
/// derived on demand so partially-updated state can never drift.
/// `consume`/`merge` keep the accumulator associative and commutative, so
/// worker-local summaries combine in any order.
///
/// Failed requests count toward `count` and the total-time statistics (their
/// `total_time` is always meaningful) but are excluded from the first-byte
/// statistics when no first byte was ever observed; `ttfb_samples` tracks how
/// many observations actually contributed there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolSummary {
    /// Every observation, including failed requests.
    pub count: usize,
    /// Observations whose `error` field was set.
    pub error_count: usize,
    /// Observations that captured a first-byte time.
    pub ttfb_samples: usize,
    pub sum_ttfb: Duration,
    pub min_ttfb: Option<Duration>,
    pub max_ttfb: Option<Duration>,
    pub sum_total_time: Duration,
    pub min_total_time: Option<Duration>,
    pub max_total_time: Option<Duration>,
    pub sum_bytes: u64,
}

impl ProtocolSummary {
    /// Fold a single observation into the running statistics.
    pub fn consume(&mut self, obs: &Observation) {
        self.count += 1;
        if obs.error.is_some() {
            self.error_count += 1;
        }
        if let Some(ttfb) = obs.time_to_first_byte {
            self.ttfb_samples += 1;
            self.sum_ttfb += ttfb;
            self.min_ttfb = min_opt(self.min_ttfb, Some(ttfb));
            self.max_ttfb = max_opt(self.max_ttfb, Some(ttfb));
        }
        self.sum_total_time += obs.total_time;
        self.min_total_time = min_opt(self.min_total_time, Some(obs.total_time));
        self.max_total_time = max_opt(self.max_total_time, Some(obs.total_time));
        self.sum_bytes += obs.bytes_received;
    }

    /// Combine two summaries for the same protocol label.
    pub fn merge(&mut self, other: Self) {
        self.count += other.count;
        self.error_count += other.error_count;
        self.ttfb_samples += other.ttfb_samples;
        self.sum_ttfb += other.sum_ttfb;
        self.min_ttfb = min_opt(self.min_ttfb, other.min_ttfb);
        self.max_ttfb = max_opt(self.max_ttfb, other.max_ttfb);
        self.sum_total_time += other.sum_total_time;
        self.min_total_time = min_opt(self.min_total_time, other.min_total_time);
        self.max_total_time = max_opt(self.max_total_time, other.max_total_time);
        self.sum_bytes += other.sum_bytes;
    }

    /// Mean first-byte latency over the observations that captured one.
    pub fn avg_ttfb(&self) -> Option<Duration> {
        (self.ttfb_samples > 0).then(|| self.sum_ttfb / self.ttfb_samples as u32)
    }

    /// Mean completion time over every observation in the group.
    pub fn avg_total_time(&self) -> Option<Duration> {
        (self.count > 0).then(|| self.sum_total_time / self.count as u32)
    }

    /// Aggregate throughput: total bytes over total time, not the mean of
    /// per-request throughputs. The distinction matters whenever request
    /// sizes vary. Zero when no time was accumulated.
    pub fn throughput_kb_s(&self) -> f64 {
        throughput_kb_s(self.sum_bytes, self.sum_total_time)
    }
}

/// Group observations by protocol label and accumulate per-group statistics.
///
/// Pure over its input; safe to call on any [`snapshot`] at any time, and on
/// an empty slice. The map is ordered by label so output is deterministic.
///
/// [`snapshot`]: crate::MetricsRecorder::snapshot
pub fn summarize(observations: &[Observation]) -> BTreeMap<String, ProtocolSummary> {
    let mut groups: BTreeMap<String, ProtocolSummary> = BTreeMap::new();
    for obs in observations {
        groups.entry(obs.protocol.clone()).or_default().consume(obs);
    }
    groups
}

/// Human-readable summary block, one section per protocol.
pub fn render(groups: &BTreeMap<String, ProtocolSummary>) -> String {
    if groups.is_empty() {
        return "No metrics recorded".to_owned();
    }
    let mut out = String::from("========== Performance Summary ==========\n");
    for (protocol, s) in groups {
        let _ = write!(out, "\n[{protocol}]\n");
        let _ = writeln!(out, "  Requests:             {} ({} failed)", s.count, s.error_count);
        if let Some(avg) = s.avg_ttfb() {
            let _ = writeln!(out, "  TTFB (avg):           {:.3} ms", millis(avg));
        }
        if let (Some(min), Some(max)) = (s.min_ttfb, s.max_ttfb) {
            let _ = writeln!(
                out,
                "  TTFB (min/max):       {:.3} / {:.3} ms",
                millis(min),
                millis(max)
            );
        }
        if let Some(avg) = s.avg_total_time() {
            let _ = writeln!(out, "  Total Time (avg):     {:.3} ms", millis(avg));
        }
        if let (Some(min), Some(max)) = (s.min_total_time, s.max_total_time) {
            let _ = writeln!(
                out,
                "  Total Time (min/max): {:.3} / {:.3} ms",
                millis(min),
                millis(max)
            );
        }
        let _ = writeln!(out, "  Throughput:           {:.2} KB/s", s.throughput_kb_s());
        let _ = writeln!(out, "  Total Bytes:          {} bytes", s.sum_bytes);
    }
    out.push_str("==========================================\n");
    out
}

fn min_opt(a: Option<Duration>, b: Option<Duration>) -> Option<Duration> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (x, None) | (None, x) => x,
    }
}

fn max_opt(a: Option<Duration>, b: Option<Duration>) -> Option<Duration> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (x, None) | (None, x) => x,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::NetworkCondition;
    use chrono::Utc;

    fn obs(protocol: &str, ttfb_ms: Option<u64>, total_ms: u64, bytes: u64) -> Observation {
        Observation {
            protocol: protocol.to_owned(),
            request_time: Utc::now(),
            time_to_first_byte: ttfb_ms.map(Duration::from_millis),
            total_time: Duration::from_millis(total_ms),
            bytes_received: bytes,
            status_code: 200,
            error: None,
            condition: NetworkCondition::default(),
        }
    }

    #[test]
    fn empty_input_summarizes_to_no_groups() {
        let groups = summarize(&[]);
        assert!(groups.is_empty());
        assert_eq!(render(&groups), "No metrics recorded");
    }

    #[test]
    fn reference_scenario_for_one_protocol() {
        let observations = vec![
            obs("HTTP/2.0", Some(10), 50, 1000),
            obs("HTTP/2.0", Some(20), 60, 2000),
            obs("HTTP/2.0", Some(30), 70, 3000),
        ];
        let groups = summarize(&observations);
        let s = &groups["HTTP/2.0"];

        assert_eq!(s.count, 3);
        assert_eq!(s.error_count, 0);
        assert_eq!(s.min_ttfb, Some(Duration::from_millis(10)));
        assert_eq!(s.max_ttfb, Some(Duration::from_millis(30)));
        assert_eq!(s.avg_ttfb(), Some(Duration::from_millis(20)));
        assert_eq!(s.min_total_time, Some(Duration::from_millis(50)));
        assert_eq!(s.max_total_time, Some(Duration::from_millis(70)));
        assert_eq!(s.avg_total_time(), Some(Duration::from_millis(60)));
        assert_eq!(s.sum_bytes, 6000);
        // 6000 bytes over 0.18s
        assert!((s.throughput_kb_s() - 33.333).abs() < 0.01);
    }

    #[test]
    fn throughput_is_aggregate_not_mean_of_per_request_rates() {
        let a = obs("HTTP/3.0", Some(1), 1000, 1000); // 1 KB/s
        let b = obs("HTTP/3.0", Some(1), 100, 9000); // 90 KB/s
        let mean_of_rates = (a.throughput_kb_s() + b.throughput_kb_s()) / 2.0;

        let groups = summarize(&[a, b]);
        let aggregate = groups["HTTP/3.0"].throughput_kb_s();

        // 10000 bytes over 1.1s
        assert!((aggregate - 9.0909).abs() < 0.001);
        assert!((mean_of_rates - aggregate).abs() > 30.0);
    }

    #[test]
    fn failed_requests_count_but_never_skew_first_byte_stats() {
        let mut failed = obs("HTTP/2.0", None, 120, 0);
        failed.status_code = 0;
        failed.error = Some("connection refused".to_owned());

        let groups = summarize(&[obs("HTTP/2.0", Some(10), 50, 1000), failed]);
        let s = &groups["HTTP/2.0"];

        assert_eq!(s.count, 2);
        assert_eq!(s.error_count, 1);
        assert_eq!(s.ttfb_samples, 1);
        assert_eq!(s.avg_ttfb(), Some(Duration::from_millis(10)));
        assert_eq!(s.max_ttfb, Some(Duration::from_millis(10)));
        // Total time includes the failure; the average covers both.
        assert_eq!(s.max_total_time, Some(Duration::from_millis(120)));
        assert_eq!(s.avg_total_time(), Some(Duration::from_millis(85)));
    }

    #[test]
    fn groups_are_keyed_and_ordered_by_label() {
        let groups = summarize(&[
            obs("HTTP/3.0", Some(5), 50, 100),
            obs("HTTP/2.0", Some(5), 50, 100),
            obs("HTTP/3.0", Some(5), 50, 100),
        ]);
        let labels: Vec<_> = groups.keys().cloned().collect();
        assert_eq!(labels, ["HTTP/2.0", "HTTP/3.0"]);
        assert_eq!(groups["HTTP/3.0"].count, 2);
    }

    #[test]
    fn merge_agrees_with_consuming_everything_in_one_pass() {
        let batch_a = [
            obs("HTTP/2.0", Some(10), 50, 1000),
            obs("HTTP/2.0", Some(30), 70, 3000),
        ];
        let batch_b = [obs("HTTP/2.0", Some(20), 60, 2000)];

        let mut left = ProtocolSummary::default();
        batch_a.iter().for_each(|o| left.consume(o));
        let mut right = ProtocolSummary::default();
        batch_b.iter().for_each(|o| right.consume(o));
        left.merge(right);

        let mut whole = ProtocolSummary::default();
        batch_a.iter().chain(&batch_b).for_each(|o| whole.consume(o));

        assert_eq!(left, whole);
    }
}
