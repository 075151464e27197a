//! Startup orchestration.
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - No network traffic here; the database and providers connect on first use

use std::sync::Arc;

use thiserror::Error;

use crate::chain::{ChainError, DataFeedSource, RpcDataFeedSource};
use crate::config::TelemetryConfig;
use crate::http::AppState;
use crate::store::{PgStore, TelemetryStore, UnconfiguredStore};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("chain providers: {0}")]
    Chain(#[from] ChainError),
}

/// Relational store for `config`: Postgres when a database is configured.
pub fn build_store(config: &TelemetryConfig) -> Arc<dyn TelemetryStore> {
    match &config.database {
        Some(database) => {
            tracing::info!(host = %database.host, port = database.port, tls = database.tls, "Using Postgres store");
            Arc::new(PgStore::new(database.clone()))
        }
        None => {
            tracing::warn!("No database configured, database-backed endpoints will fail");
            Arc::new(UnconfiguredStore)
        }
    }
}

/// Build the shared handler state from a validated configuration.
pub fn build_state(config: TelemetryConfig) -> Result<AppState, StartupError> {
    let store = build_store(&config);
    let chain: Arc<dyn DataFeedSource> = Arc::new(RpcDataFeedSource::from_config(&config)?);
    Ok(AppState::new(config, store, chain))
}
