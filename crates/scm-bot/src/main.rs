//! Layered liquidity market maker - Entry Point
//!
//! Reads closed candles as JSON lines from stdin and trades them on the
//! paper venue.

use anyhow::Result;
use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Layered liquidity market maker for stablecoin pairs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via SCM_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// JSON-lines candle file used to warm up the indicators
    #[arg(short, long)]
    preload: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    scm_telemetry::init_logging()?;

    info!("Starting scm-bot v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > SCM_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("SCM_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = scm_bot::AppConfig::from_file(&config_path)?;
    info!(
        symbol = %config.strategy.symbol,
        layers = config.strategy.num_of_liquidity_layers,
        "Configuration loaded"
    );

    let mut app = scm_bot::Application::new(config)?;

    if let Some(path) = args.preload {
        let klines = scm_bot::feed::read_klines(&path)?;
        info!(path = %path, candles = klines.len(), "Loaded preload candles");
        app.preload(&klines);
    }

    let (kline_tx, kline_rx) = mpsc::channel(1024);
    let reader = tokio::spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        if let Err(e) = scm_bot::feed::forward_klines(stdin, kline_tx).await {
            error!(?e, "Candle input failed");
        }
    });

    app.run(kline_rx).await?;
    reader.abort();

    Ok(())
}
