//! Row types and the store trait shared by handlers and jobs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the relational store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No database section in the configuration.
    #[error("database is not configured")]
    NotConfigured,

    /// A query was issued before `connect` succeeded.
    #[error("database session is not established")]
    NotConnected,

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
}

/// Latest known USD price for a coin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinValue {
    pub symbol: String,
    pub value: f64,
    pub coingecko_api_name: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One deviation sample for a beacon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconDeviation {
    pub time: DateTime<Utc>,
    pub deviation: f64,
}

/// Relational reads and writes used by the handlers.
///
/// Every method is a single parameterized statement so callers can wrap it in
/// [`crate::resilience::execute`] without side effects beyond the statement itself.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Establish (or confirm) a live session.
    async fn connect(&self) -> Result<(), StoreError>;

    async fn coin_value(&self, symbol: &str) -> Result<Option<CoinValue>, StoreError>;

    /// CoinGecko API ids of every tracked coin.
    async fn coingecko_ids(&self) -> Result<Vec<String>, StoreError>;

    /// Bulk price update; `symbols[i]` receives `values[i]`. Returns rows touched.
    async fn update_coin_values(&self, symbols: &[String], values: &[f64]) -> Result<u64, StoreError>;

    /// Deviation samples from the last 12 hours, oldest first.
    async fn beacon_deviations(
        &self,
        beacon_id: &str,
        chain_id: &str,
    ) -> Result<Vec<BeaconDeviation>, StoreError>;

    /// Data feed id most recently assigned to a bytes32 dAPI name on a chain.
    async fn data_feed_id_for_dapi_name(
        &self,
        chain_id: &str,
        dapi_name: &str,
    ) -> Result<Option<String>, StoreError>;
}

/// Store used when no database is configured; every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredStore;

#[async_trait]
impl TelemetryStore for UnconfiguredStore {
    async fn connect(&self) -> Result<(), StoreError> {
        Err(StoreError::NotConfigured)
    }

    async fn coin_value(&self, _symbol: &str) -> Result<Option<CoinValue>, StoreError> {
        Err(StoreError::NotConfigured)
    }

    async fn coingecko_ids(&self) -> Result<Vec<String>, StoreError> {
        Err(StoreError::NotConfigured)
    }

    async fn update_coin_values(&self, _symbols: &[String], _values: &[f64]) -> Result<u64, StoreError> {
        Err(StoreError::NotConfigured)
    }

    async fn beacon_deviations(
        &self,
        _beacon_id: &str,
        _chain_id: &str,
    ) -> Result<Vec<BeaconDeviation>, StoreError> {
        Err(StoreError::NotConfigured)
    }

    async fn data_feed_id_for_dapi_name(
        &self,
        _chain_id: &str,
        _dapi_name: &str,
    ) -> Result<Option<String>, StoreError> {
        Err(StoreError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_value_wire_names() {
        let value = CoinValue {
            symbol: "ETH".to_string(),
            value: 1834.5,
            coingecko_api_name: Some("ethereum".to_string()),
            updated_at: None,
        };
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["coingecko_api_name"], "ethereum");
        assert!(json["updated_at"].is_null());
    }

    #[tokio::test]
    async fn test_unconfigured_store_fails() {
        let store = UnconfiguredStore;
        assert!(matches!(store.connect().await, Err(StoreError::NotConfigured)));
        assert!(matches!(store.coin_value("ETH").await, Err(StoreError::NotConfigured)));
    }
}
