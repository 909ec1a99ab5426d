use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Descriptive metadata about the emulated network condition a request ran
/// under (tc/netem or similar, applied outside this process). Recorded as-is,
/// never validated against actual network behavior.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkCondition {
    /// Emulated delay in milliseconds.
    pub delay_ms: u32,
    /// Emulated packet loss rate in percent.
    pub loss_pct: f64,
    /// Emulated bandwidth cap (e.g. "10mbit"), when shaping by bandwidth
    /// instead of loss.
    pub bandwidth: Option<String>,
}

/// The full outcome of a single measured request. Immutable once constructed.
///
/// Exactly one of two shapes holds: either `error` is set, or `status_code`
/// and `bytes_received` describe a completed transfer. `total_time` is always
/// populated, success or failure. `time_to_first_byte` is `None` when the
/// request failed before any response byte arrived, and never exceeds
/// `total_time` when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Transport label the observation is grouped under, e.g. "HTTP/2.0".
    pub protocol: String,
    /// Wall-clock instant the request was initiated.
    pub request_time: DateTime<Utc>,
    /// Elapsed time until the first response body byte became observable.
    pub time_to_first_byte: Option<Duration>,
    /// Elapsed time until the request completed, success or failure.
    pub total_time: Duration,
    /// Body bytes fully read; partial on a mid-body failure.
    pub bytes_received: u64,
    /// HTTP status code; 0 if the request never reached a response.
    pub status_code: u16,
    /// Failure description; present means the request did not complete.
    pub error: Option<String>,
    /// Emulated network condition this observation was taken under.
    pub condition: NetworkCondition,
}

impl Observation {
    /// Whether the request completed without a transport or read failure.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Per-request throughput in KB/s (decimal kilobytes).
    pub fn throughput_kb_s(&self) -> f64 {
        throughput_kb_s(self.bytes_received, self.total_time)
    }
}

/// KB/s over an elapsed window; defined as zero when no time elapsed.
pub(crate) fn throughput_kb_s(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 {
        0.0
    } else {
        bytes as f64 / 1000.0 / secs
    }
}

pub(crate) fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_elapsed_time_yields_zero_throughput() {
        assert_eq!(throughput_kb_s(4096, Duration::ZERO), 0.0);
    }

    #[test]
    fn throughput_uses_decimal_kilobytes() {
        // 1000 bytes over 50ms -> 20 KB/s
        let kb_s = throughput_kb_s(1000, Duration::from_millis(50));
        assert!((kb_s - 20.0).abs() < f64::EPSILON);
    }
}
