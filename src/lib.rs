//! Protobench — a benchmarking harness for comparing HTTP transports.
//!
//! Protobench issues repeated GET requests against a target server, measures
//! per-request latency and throughput milestones, persists every observation
//! to a durable CSV record as it happens, and aggregates the results into a
//! per-protocol summary. Its reason to exist is comparing transports (e.g.
//! HTTP/2 vs HTTP/3) under emulated network conditions — delay, loss, and
//! bandwidth caps that are applied outside this process and recorded here as
//! metadata.
//!
//! # Architecture
//!
//! The pipeline is a handful of small building blocks:
//!
//! - [`Observation`]: the full outcome of one measured request — first-byte
//!   time, total time, bytes, status, optional error, network-condition
//!   metadata. Immutable once constructed.
//! - [`measure_request`]: the instrumented runner. Performs exactly one GET
//!   against a supplied `reqwest` client and turns its lifecycle into an
//!   `Observation`. Transport failures become data, never panics or aborts.
//! - [`MetricsRecorder`]: the only shared mutable state. Thread-safe sink
//!   that appends each observation to an in-memory log and a flushed CSV row
//!   under one lock, and hands out immutable snapshots while recording
//!   continues.
//! - [`summarize`]: a pure function from a snapshot to per-protocol
//!   [`ProtocolSummary`] statistics. Recomputable at any time; nothing
//!   derived is ever stored.
//! - [`BenchmarkDriver`]: thin orchestration — a paced loop of runner +
//!   recorder calls.
//!
//! # Example
//!
//! ```no_run
//! use protobench::{BenchmarkDriver, MetricsRecorder, ShapingMode, summarize};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let recorder = MetricsRecorder::create("results.csv", ShapingMode::Loss)?;
//!
//!     let driver = BenchmarkDriver::builder()
//!         .client(reqwest::Client::new())
//!         .url("https://localhost:2000/")
//!         .requests(100)
//!         .build();
//!     driver.run(&recorder).await;
//!     recorder.close()?;
//!
//!     for (protocol, stats) in summarize(&recorder.snapshot()) {
//!         println!("{protocol}: {} requests, {:.2} KB/s", stats.count, stats.throughput_kb_s());
//!     }
//!     Ok(())
//! }
//! ```

/// Paced benchmark loop over runner and recorder
pub mod driver;
/// Error taxonomy for the measurement pipeline
pub mod error;
/// Value types for a single measured request
pub mod observation;
/// Thread-safe, durably-persisting observation sink
pub mod recorder;
/// Instrumented single-request runner
pub mod runner;
/// Per-protocol statistics over recorded observations
pub mod summary;

pub use driver::BenchmarkDriver;
pub use error::Error;
pub use observation::{NetworkCondition, Observation};
pub use recorder::{MetricsRecorder, ShapingMode};
pub use runner::measure_request;
pub use summary::{summarize, ProtocolSummary};
