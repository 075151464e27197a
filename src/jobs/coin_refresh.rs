//! Periodic coin price refresh from CoinGecko.
//!
//! # Responsibilities
//! - Read the CoinGecko ids of every tracked coin
//! - Fetch USD prices from `/coins/markets`
//! - Write all prices back in one statement

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::config::{CoinGeckoConfig, RetryPolicies};
use crate::observability::metrics;
use crate::resilience::{execute, AttemptError};
use crate::store::{StoreError, TelemetryStore};

/// One entry of the CoinGecko `/coins/markets` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CoinGeckoApiResult {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub current_price: Option<f64>,
}

#[derive(Debug, Error)]
pub enum CoinRefreshError {
    #[error("database initialization failed: {0}")]
    Connect(AttemptError<StoreError>),

    #[error("could not read CoinGecko ids: {0}")]
    Ids(AttemptError<StoreError>),

    #[error("no CoinGecko id found in the database")]
    NoIds,

    #[error("CoinGecko request failed: {0}")]
    Fetch(AttemptError<reqwest::Error>),

    #[error("coin value update failed: {0}")]
    Update(AttemptError<StoreError>),
}

/// Refreshes stored coin values from CoinGecko.
pub struct CoinRefresher {
    store: Arc<dyn TelemetryStore>,
    client: reqwest::Client,
    config: CoinGeckoConfig,
    retries: RetryPolicies,
}

impl CoinRefresher {
    pub fn new(
        store: Arc<dyn TelemetryStore>,
        client: reqwest::Client,
        config: CoinGeckoConfig,
        retries: RetryPolicies,
    ) -> Self {
        Self {
            store,
            client,
            config,
            retries,
        }
    }

    /// One refresh pass. Returns the number of rows updated.
    pub async fn refresh_once(&self) -> Result<u64, CoinRefreshError> {
        let store = self.store.as_ref();

        let outcome = execute(|| store.connect(), &self.retries.connect).await;
        metrics::record_outbound_call("db_connect", outcome.label());
        outcome.into_result().map_err(CoinRefreshError::Connect)?;

        let outcome = execute(|| store.coingecko_ids(), &self.retries.query).await;
        metrics::record_outbound_call("coingecko_ids", outcome.label());
        let ids = outcome.into_result().map_err(CoinRefreshError::Ids)?;
        if ids.is_empty() {
            return Err(CoinRefreshError::NoIds);
        }

        let outcome = execute(|| self.fetch_coin_values(&ids), &self.retries.http).await;
        metrics::record_outbound_call("coingecko_markets", outcome.label());
        let coins = outcome.into_result().map_err(CoinRefreshError::Fetch)?;

        let (symbols, values): (Vec<String>, Vec<f64>) = coins
            .into_iter()
            .filter_map(|coin| coin.current_price.map(|price| (coin.symbol, price)))
            .unzip();

        let outcome = execute(
            || store.update_coin_values(&symbols, &values),
            &self.retries.query,
        )
        .await;
        metrics::record_outbound_call("update_coin_values", outcome.label());
        let updated = outcome.into_result().map_err(CoinRefreshError::Update)?;

        tracing::info!(requested = ids.len(), priced = symbols.len(), updated, "Coin values updated");
        Ok(updated)
    }

    async fn fetch_coin_values(&self, ids: &[String]) -> Result<Vec<CoinGeckoApiResult>, reqwest::Error> {
        let url = format!("{}/coins/markets", self.config.base_url.trim_end_matches('/'));
        let ids = ids.join(",");

        self.client
            .get(url)
            .query(&[("vs_currency", "usd"), ("ids", ids.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// Refresh on every interval tick until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Coin value refresh disabled");
            return;
        }

        tracing::info!(
            interval = self.config.refresh_interval_secs,
            base_url = %self.config.base_url,
            "Coin value refresh starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.refresh_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh_once().await {
                        tracing::error!(error = %e, "Coin value refresh failed");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Coin value refresh received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

impl std::fmt::Debug for CoinRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinRefresher")
            .field("config", &self.config)
            .finish()
    }
}
