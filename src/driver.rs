use std::time::Duration;

use typed_builder::TypedBuilder;

use crate::observation::NetworkCondition;
use crate::recorder::MetricsRecorder;
use crate::runner::measure_request;

/// Sequential benchmark loop: N measured requests, each recorded, with a
/// fixed pacing delay between them.
///
/// Pacing bounds load on the target and sits outside the measured window, so
/// it never contributes to an observation's `total_time`. A failed `record`
/// is logged and the run continues; one bad write must not lose the rest of
/// the run.
#[derive(TypedBuilder)]
pub struct BenchmarkDriver {
    pub client: reqwest::Client,
    #[builder(setter(into))]
    pub url: String,
    /// Label applied when a request fails before the transport reports a
    /// negotiated protocol version.
    #[builder(default = "HTTP/2.0".to_owned(), setter(into))]
    pub protocol: String,
    #[builder(default = 100)]
    pub requests: usize,
    #[builder(default = Duration::from_millis(10))]
    pub pacing: Duration,
    #[builder(default)]
    pub condition: NetworkCondition,
}

impl BenchmarkDriver {
    pub async fn run(&self, recorder: &MetricsRecorder) {
        for i in 0..self.requests {
            let observation =
                measure_request(&self.client, &self.url, &self.protocol, &self.condition).await;
            if let Err(err) = recorder.record(observation) {
                tracing::warn!(request = i + 1, %err, "failed to persist observation");
            }
            if (i + 1) % 10 == 0 {
                tracing::info!("progress: {}/{} requests completed", i + 1, self.requests);
            }
            if !self.pacing.is_zero() && i + 1 < self.requests {
                tokio::time::sleep(self.pacing).await;
            }
        }
    }
}
