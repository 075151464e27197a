//! Postgres-backed [`TelemetryStore`].
//!
//! One session is opened lazily and shared by all requests. A closed session
//! is replaced on the next `connect`.

use std::sync::Arc;

use async_trait::async_trait;
use postgres_native_tls::MakeTlsConnector;
use tokio::sync::Mutex;
use tokio_postgres::config::SslMode;
use tokio_postgres::{Client, NoTls};

use crate::config::DatabaseConfig;
use crate::store::types::{BeaconDeviation, CoinValue, StoreError, TelemetryStore};

/// Statement templates. Values are always bound positionally.
pub mod queries {
    pub const PING: &str = "select 1;";

    pub const COIN_VALUE: &str = r#"
        SELECT symbol, value, coingecko_api_name, updated_at
        FROM coin_value
        WHERE symbol = $1
        LIMIT 1
    "#;

    pub const COINGECKO_IDS: &str = r#"
        SELECT coingecko_api_name AS "coinGeckoId"
        FROM coin_value
        WHERE coingecko_api_name IS NOT NULL
    "#;

    pub const UPDATE_COIN_VALUES: &str = r#"
        UPDATE coin_value AS current
        SET value = updated.value, updated_at = current_timestamp
        FROM (SELECT UNNEST($1::TEXT[]) AS symbol, UNNEST($2::DOUBLE PRECISION[]) AS value)
        AS updated(symbol, value)
        WHERE current.symbol = updated.symbol
    "#;

    pub const BEACON_DEVIATIONS: &str = r#"
        SELECT
            "time"::TIMESTAMPTZ AS "time",
            (metric / 10^16)::DOUBLE PRECISION AS "deviation"
        FROM api_beacon_deviation
        WHERE
            "time" > NOW() - INTERVAL '12 hours' AND
            metadata->>'beaconId' LIKE $1 AND
            metadata->>'chainId' = $2
        ORDER BY 1, 2
    "#;

    pub const DAPI_NAME_DATA_FEED_ID: &str = r#"
        SELECT event_data->'parsedLog'->'args'->>1 AS "dataFeedId"
        FROM dapi_events
        WHERE
            chain::TEXT = $1 AND
            event_name = 'SetDapiName' AND
            event_data->'parsedLog'->'args'->>0 = $2
        ORDER BY block DESC
        LIMIT 1
    "#;
}

/// Postgres store with a lazily opened, shared session.
pub struct PgStore {
    config: DatabaseConfig,
    client: Mutex<Option<Arc<Client>>>,
}

impl PgStore {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            client: Mutex::new(None),
        }
    }

    fn pg_config(&self) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.config.host)
            .port(self.config.port)
            .user(&self.config.user)
            .password(&self.config.password)
            .dbname(&self.config.database);
        pg
    }

    async fn open(&self) -> Result<Client, StoreError> {
        let mut pg = self.pg_config();

        if self.config.tls {
            let connector = native_tls::TlsConnector::builder()
                .build()
                .map_err(|e| StoreError::Tls(e.to_string()))?;
            pg.ssl_mode(SslMode::Require);
            let (client, connection) = pg.connect(MakeTlsConnector::new(connector)).await?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!(error = %e, "Postgres connection closed with error");
                }
            });
            Ok(client)
        } else {
            let (client, connection) = pg.connect(NoTls).await?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!(error = %e, "Postgres connection closed with error");
                }
            });
            Ok(client)
        }
    }

    async fn client(&self) -> Result<Arc<Client>, StoreError> {
        self.client
            .lock()
            .await
            .as_ref()
            .filter(|c| !c.is_closed())
            .cloned()
            .ok_or(StoreError::NotConnected)
    }
}

impl std::fmt::Debug for PgStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStore")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("database", &self.config.database)
            .field("tls", &self.config.tls)
            .finish()
    }
}

#[async_trait]
impl TelemetryStore for PgStore {
    async fn connect(&self) -> Result<(), StoreError> {
        let mut guard = self.client.lock().await;
        if guard.as_ref().is_some_and(|c| !c.is_closed()) {
            return Ok(());
        }

        let client = self.open().await?;
        client.simple_query(queries::PING).await?;

        tracing::info!(host = %self.config.host, database = %self.config.database, "Database session established");
        *guard = Some(Arc::new(client));
        Ok(())
    }

    async fn coin_value(&self, symbol: &str) -> Result<Option<CoinValue>, StoreError> {
        let client = self.client().await?;
        let row = client.query_opt(queries::COIN_VALUE, &[&symbol]).await?;

        row.map(|row| -> Result<CoinValue, StoreError> {
            Ok(CoinValue {
                symbol: row.try_get("symbol")?,
                value: row.try_get("value")?,
                coingecko_api_name: row.try_get("coingecko_api_name")?,
                updated_at: row.try_get("updated_at")?,
            })
        })
        .transpose()
    }

    async fn coingecko_ids(&self) -> Result<Vec<String>, StoreError> {
        let client = self.client().await?;
        let rows = client.query(queries::COINGECKO_IDS, &[]).await?;
        rows.iter()
            .map(|row| row.try_get("coinGeckoId").map_err(StoreError::from))
            .collect()
    }

    async fn update_coin_values(&self, symbols: &[String], values: &[f64]) -> Result<u64, StoreError> {
        let client = self.client().await?;
        Ok(client
            .execute(queries::UPDATE_COIN_VALUES, &[&symbols, &values])
            .await?)
    }

    async fn beacon_deviations(
        &self,
        beacon_id: &str,
        chain_id: &str,
    ) -> Result<Vec<BeaconDeviation>, StoreError> {
        let client = self.client().await?;
        let rows = client
            .query(queries::BEACON_DEVIATIONS, &[&beacon_id, &chain_id])
            .await?;

        rows.iter()
            .map(|row| -> Result<BeaconDeviation, StoreError> {
                Ok(BeaconDeviation {
                    time: row.try_get("time")?,
                    deviation: row.try_get("deviation")?,
                })
            })
            .collect()
    }

    async fn data_feed_id_for_dapi_name(
        &self,
        chain_id: &str,
        dapi_name: &str,
    ) -> Result<Option<String>, StoreError> {
        let client = self.client().await?;
        let row = client
            .query_opt(queries::DAPI_NAME_DATA_FEED_ID, &[&chain_id, &dapi_name])
            .await?;

        match row {
            Some(row) => Ok(row.try_get("dataFeedId")?),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [&str; 5] = [
        queries::COIN_VALUE,
        queries::COINGECKO_IDS,
        queries::UPDATE_COIN_VALUES,
        queries::BEACON_DEVIATIONS,
        queries::DAPI_NAME_DATA_FEED_ID,
    ];

    #[test]
    fn test_queries_bind_positionally() {
        for query in ALL {
            assert!(!query.contains('{'), "template placeholder in {query}");
        }
        assert!(queries::COIN_VALUE.contains("$1"));
        assert!(queries::UPDATE_COIN_VALUES.contains("$2::DOUBLE PRECISION[]"));
        assert!(queries::BEACON_DEVIATIONS.contains("$2"));
        assert!(queries::DAPI_NAME_DATA_FEED_ID.contains("$2"));
    }

    #[tokio::test]
    async fn test_query_before_connect() {
        let store = PgStore::new(DatabaseConfig::default());
        assert!(matches!(
            store.coin_value("ETH").await,
            Err(StoreError::NotConnected)
        ));
    }
}
