//! Bracket order bot - Entry Point
//!
//! Opens a stop-loss/take-profit bracket on the paper exchange and polls it
//! until it resolves, for the configured number of cycles.

use anyhow::Result;
use bracket_core::Direction;
use clap::Parser;
use tracing::info;

/// Bracket order bot
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via BRACKET_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Trade direction override (long or short)
    #[arg(short, long)]
    direction: Option<Direction>,

    /// Number of brackets to complete before exiting (0 runs until ctrl-c)
    #[arg(long)]
    cycles: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    bracket_telemetry::init_logging()?;

    info!("Starting bracket bot v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > BRACKET_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("BRACKET_CONFIG").ok())
        .unwrap_or_else(|| bracket_bot::config::DEFAULT_CONFIG_PATH.to_string());

    info!(config_path = %config_path, "Loading configuration");

    let mut config = bracket_bot::AppConfig::from_file(&config_path)?;
    if let Some(direction) = args.direction {
        config.trade.direction = direction;
    }
    if let Some(cycles) = args.cycles {
        config.poll.max_cycles = cycles;
    }
    info!(
        ?config.mode,
        market = %config.bracket.market,
        direction = %config.trade.direction,
        "Configuration loaded"
    );

    let mut app = bracket_bot::Application::new(config)?;
    app.run().await?;

    Ok(())
}
