use thiserror::Error;

/// Failures of the measurement pipeline itself.
///
/// Transport-level failures are deliberately absent: a request that dies on
/// the wire still produces an [`Observation`](crate::Observation) with its
/// `error` field set, and never aborts a run. Only the durable sink can fail
/// in a way the caller has to handle.
#[derive(Debug, Error)]
pub enum Error {
    /// The durable sink could not be created or flushed.
    #[error("metrics sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A row could not be serialized or written to the sink.
    #[error("metrics sink write error: {0}")]
    Csv(#[from] csv::Error),

    /// `record` was called after `close`.
    #[error("metrics sink is closed")]
    SinkClosed,
}
