//! Oracle telemetry API server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ http (request id, trace, timeout, headers)
//!                      │
//!                      ├─▶ /coin-value, /volatility ──▶ store (Postgres)
//!                      ├─▶ /chain-value ─────────────▶ chain (DapiServer reads)
//!                      └─▶ /last-transactions ───────▶ store::transactions ──▶ chain (logs)
//!
//!     jobs::coin_refresh ──▶ CoinGecko ──▶ store
//!
//!     All outbound calls: resilience::retry (attempt timeout, retries, total budget)
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use oracle_telemetry_api::config::{load_config, resolve_config_path, TelemetryConfig};
use oracle_telemetry_api::jobs::CoinRefresher;
use oracle_telemetry_api::lifecycle::{build_state, signals, startup, Shutdown};
use oracle_telemetry_api::observability::{logging, metrics};
use oracle_telemetry_api::HttpServer;

#[derive(Parser)]
#[command(name = "oracle-telemetry-api")]
#[command(version, about = "Oracle telemetry HTTP API", long_about = None)]
struct Cli {
    /// Config file (defaults to $TELEMETRY_CONFIG, then telemetry.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Refresh coin values from CoinGecko once and exit
    RefreshCoins,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let path = resolve_config_path(cli.config.as_deref());
    let config = load_config(&path)?;
    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %path.display(),
        chains = config.deployments.len(),
        database = config.database.is_some(),
        "oracle-telemetry-api starting"
    );

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::RefreshCoins => refresh_coins(config).await,
    }
}

async fn serve(config: TelemetryConfig) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let state = build_state(config)?;

    if state.config.coingecko.enabled {
        let refresher = CoinRefresher::new(
            state.store.clone(),
            reqwest::Client::new(),
            state.config.coingecko.clone(),
            state.config.retries,
        );
        tokio::spawn(refresher.run(shutdown.subscribe()));
    }

    tokio::spawn(signals::shutdown_on_signal(shutdown.clone()));

    HttpServer::new(state)
        .run(listener, shutdown.subscribe())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn refresh_coins(config: TelemetryConfig) -> Result<(), Box<dyn std::error::Error>> {
    let refresher = CoinRefresher::new(
        startup::build_store(&config),
        reqwest::Client::new(),
        config.coingecko.clone(),
        config.retries,
    );

    let updated = refresher.refresh_once().await?;
    tracing::info!(updated, "Values updated successfully");
    Ok(())
}
