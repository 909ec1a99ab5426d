use std::fs::File;
use std::io;
use std::path::Path;

use chrono::SecondsFormat;
use parking_lot::Mutex;

use crate::error::Error;
use crate::observation::{millis, Observation};

/// Which shaping column the durable sink carries. A run emulates either
/// packet loss or a bandwidth cap, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapingMode {
    Loss,
    Bandwidth,
}

impl ShapingMode {
    fn header(self) -> &'static str {
        match self {
            ShapingMode::Loss => "NetworkLoss(%)",
            ShapingMode::Bandwidth => "Bandwidth",
        }
    }
}

/// Thread-safe sink for [`Observation`]s.
///
/// Every `record` appends to an in-memory log and writes one flushed CSV row,
/// as a unit, under a single lock. Rows land in the order `record` calls
/// complete under the lock. The recorder exclusively owns its sink: one
/// recorder per run, one run per file.
pub struct MetricsRecorder {
    inner: Mutex<Inner>,
    shaping: ShapingMode,
}

struct Inner {
    log: Vec<Observation>,
    sink: Option<csv::Writer<Box<dyn io::Write + Send>>>,
}

impl MetricsRecorder {
    /// Open the durable sink at `path` and write the header row.
    ///
    /// Failing here is fatal to starting a run: no measurement happens
    /// without a working sink.
    pub fn create(path: impl AsRef<Path>, shaping: ShapingMode) -> Result<Self, Error> {
        let file: Box<dyn io::Write + Send> = Box::new(File::create(path)?);
        let mut sink = csv::Writer::from_writer(file);
        sink.write_record([
            "Protocol",
            "RequestTime",
            "TTFB(ms)",
            "TotalTime(ms)",
            "BytesReceived",
            "StatusCode",
            "Error",
            "NetworkDelay(ms)",
            shaping.header(),
            "Throughput(KB/s)",
        ])?;
        sink.flush()?;
        Ok(Self {
            inner: Mutex::new(Inner {
                log: Vec::new(),
                sink: Some(sink),
            }),
            shaping,
        })
    }

    /// Wrap an arbitrary writer as the sink, skipping the header row. Lets
    /// tests inject a writer that fails on demand.
    #[cfg(test)]
    fn with_sink(writer: Box<dyn io::Write + Send>, shaping: ShapingMode) -> Self {
        Self {
            inner: Mutex::new(Inner {
                log: Vec::new(),
                sink: Some(csv::Writer::from_writer(writer)),
            }),
            shaping,
        }
    }

    /// Append `observation` to the in-memory log and persist it as one
    /// flushed CSV row.
    ///
    /// Safe to call concurrently. On a durable write failure the error is
    /// returned but the in-memory append stands: the observation is still
    /// queryable via [`snapshot`](Self::snapshot), so a bad disk degrades
    /// durability without losing data. After [`close`](Self::close) this
    /// fails with [`Error::SinkClosed`] and records nothing.
    pub fn record(&self, observation: Observation) -> Result<(), Error> {
        let mut inner = self.inner.lock();
        let Inner { log, sink } = &mut *inner;
        let Some(sink) = sink.as_mut() else {
            return Err(Error::SinkClosed);
        };
        let row = encode_row(&observation, self.shaping);
        log.push(observation);
        sink.write_record(&row)?;
        sink.flush()?;
        Ok(())
    }

    /// Immutable copy of everything recorded so far; safe while recording
    /// continues.
    pub fn snapshot(&self) -> Vec<Observation> {
        self.inner.lock().log.clone()
    }

    /// Flush and release the durable sink. Idempotent: closing an
    /// already-closed recorder is a no-op.
    ///
    /// The sink is released even when the final flush fails.
    pub fn close(&self) -> Result<(), Error> {
        let mut inner = self.inner.lock();
        match inner.sink.take() {
            Some(mut sink) => {
                sink.flush()?;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// One CSV row, field formats matching the header contract exactly: times in
/// ms with 3 decimals, loss with 2 decimals, throughput in KB/s with 2
/// decimals and 0.00 when no time elapsed.
fn encode_row(obs: &Observation, shaping: ShapingMode) -> [String; 10] {
    let shaped = match shaping {
        ShapingMode::Loss => format!("{:.2}", obs.condition.loss_pct),
        ShapingMode::Bandwidth => obs
            .condition
            .bandwidth
            .clone()
            .unwrap_or_else(|| "0".to_owned()),
    };
    [
        obs.protocol.clone(),
        obs.request_time.to_rfc3339_opts(SecondsFormat::Micros, true),
        format!("{:.3}", millis(obs.time_to_first_byte.unwrap_or_default())),
        format!("{:.3}", millis(obs.total_time)),
        obs.bytes_received.to_string(),
        obs.status_code.to_string(),
        obs.error.clone().unwrap_or_default(),
        obs.condition.delay_ms.to_string(),
        shaped,
        format!("{:.2}", obs.throughput_kb_s()),
    ]
}
