use clap::Parser;
use std::io::Read as _;
use std::path::PathBuf;
use telemetry_common::Config;
use telemetry_gateway::run_request;
use telemetry_store::GatewayRequest;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "telemetry-gateway")]
#[command(about = "Telemetry ingestion core — runs one batch request from a file or stdin")]
struct Cli {
    /// Path to a gateway-shaped JSON request ({"body":..., "headers":...}). Reads stdin if omitted.
    #[arg(long)]
    request_file: Option<PathBuf>,

    /// Value echoed back as `requestId` in the response.
    #[arg(long, default_value = "cli-request")]
    request_id: String,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    let raw = match &cli.request_file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let envelope: serde_json::Value = serde_json::from_str(&raw)?;
    let body = envelope.get("body").cloned().unwrap_or(envelope);

    let config = Config::load()?;
    info!(events_table = %config.events_table, "loaded configuration");

    let request = GatewayRequest {
        body,
        request_id: cli.request_id,
    };
    let now_ms = std::time::SystemTime::now()
    .duration_since(std::time::UNIX_EPOCH)
    .unwrap_or_default()
    .as_millis() as i64;
    let response = run_request(config, request, now_ms).await;

    println!("{}", serde_json::to_string_pretty(&response.body)?);
    std::process::exit(if response.status_code == 200 { 0 } else { 1 });
}
