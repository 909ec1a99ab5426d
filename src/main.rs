use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use protobench::{summarize, summary, BenchmarkDriver, MetricsRecorder, NetworkCondition, ShapingMode};

#[derive(Debug, Parser)]
#[command(name = "protobench", about = "HTTP protocol benchmarking harness")]
struct Args {
    /// Target server URL.
    #[arg(long, default_value = "https://localhost:2000/")]
    url: String,

    /// Number of requests to issue.
    #[arg(short = 'n', long, default_value_t = 100)]
    requests: usize,

    /// Output CSV file.
    #[arg(short, long, default_value = "benchmark_results.csv")]
    output: PathBuf,

    /// Protocol label recorded when a request fails before negotiation.
    #[arg(long, default_value = "HTTP/2.0")]
    protocol: String,

    /// Emulated network delay in ms, recorded as metadata.
    #[arg(long, default_value_t = 0)]
    delay: u32,

    /// Emulated packet loss rate in %, recorded as metadata.
    #[arg(long, default_value_t = 0.0, conflicts_with = "bandwidth")]
    loss: f64,

    /// Emulated bandwidth cap (e.g. "10mbit"), recorded as metadata; switches
    /// the shaping column of the CSV from NetworkLoss(%) to Bandwidth.
    #[arg(long)]
    bandwidth: Option<String>,

    /// Delay between requests in ms.
    #[arg(long, default_value_t = 10)]
    pacing_ms: u64,

    /// Per-request client timeout in seconds.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Accept self-signed certificates.
    #[arg(long)]
    insecure: bool,

    /// Print the summary as JSON instead of the text block.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    // No measurement without a working sink.
    let shaping = if args.bandwidth.is_some() {
        ShapingMode::Bandwidth
    } else {
        ShapingMode::Loss
    };
    let recorder = MetricsRecorder::create(&args.output, shaping)?;

    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(args.insecure)
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;

    let condition = NetworkCondition {
        delay_ms: args.delay,
        loss_pct: args.loss,
        bandwidth: args.bandwidth.clone(),
    };

    tracing::info!(url = %args.url, requests = args.requests, "starting benchmark");

    let driver = BenchmarkDriver::builder()
        .client(client)
        .url(args.url)
        .protocol(args.protocol)
        .requests(args.requests)
        .pacing(Duration::from_millis(args.pacing_ms))
        .condition(condition)
        .build();
    driver.run(&recorder).await;
    recorder.close()?;

    let groups = summarize(&recorder.snapshot());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
    } else {
        println!("{}", summary::render(&groups));
    }
    println!("Results saved to: {}", args.output.display());
    Ok(())
}
