//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the TOML config file.
//! Every section has defaults so a minimal file only names providers and
//! deployments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chain::ChainId;
use crate::resilience::RetryPolicy;

/// Root configuration for the telemetry API.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Headers added to every handler response (CORS and friends).
    pub headers: BTreeMap<String, String>,

    /// JSON-RPC endpoint per chain id.
    pub providers: BTreeMap<String, String>,

    /// DapiServer contract address per chain id.
    pub deployments: BTreeMap<String, String>,

    /// Relational store. Handlers that need it answer 500 when absent.
    pub database: Option<DatabaseConfig>,

    /// CoinGecko price refresh.
    pub coingecko: CoinGeckoConfig,

    /// In-memory beacon update log.
    pub transactions: TransactionsConfig,

    /// Retry policy per call class.
    pub retries: RetryPolicies,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl TelemetryConfig {
    /// JSON-RPC endpoint for `chain`, matching keys by numeric value.
    pub fn provider_for(&self, chain: ChainId) -> Option<&str> {
        lookup_chain(&self.providers, chain)
    }

    /// DapiServer address for `chain`, matching keys by numeric value.
    pub fn deployment_for(&self, chain: ChainId) -> Option<&str> {
        lookup_chain(&self.deployments, chain)
    }
}

fn lookup_chain(map: &BTreeMap<String, String>, chain: ChainId) -> Option<&str> {
    map.iter()
        .find(|(key, _)| key.parse::<ChainId>().ok() == Some(chain))
        .map(|(_, value)| value.as_str())
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Request timeout in seconds, applied as a tower layer.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// Postgres connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,

    /// Negotiate TLS before the Postgres handshake.
    pub tls: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 65432,
            user: "postgres".to_string(),
            password: String::new(),
            database: "postgres".to_string(),
            tls: true,
        }
    }
}

/// CoinGecko market data refresh.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CoinGeckoConfig {
    /// Run the refresh loop inside the server.
    pub enabled: bool,

    /// API base URL, without trailing slash.
    pub base_url: String,

    /// Seconds between refreshes when running inside the server.
    pub refresh_interval_secs: u64,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            refresh_interval_secs: 300,
        }
    }
}

/// Beacon update log kept in memory.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionsConfig {
    /// Refresh when the last refresh is older than this.
    pub max_age_secs: u64,

    /// Blocks scanned on a chain's first refresh.
    pub lookback_blocks: u64,

    /// Number of updates returned when the caller gives no limit.
    pub default_count: usize,
}

impl Default for TransactionsConfig {
    fn default() -> Self {
        Self {
            max_age_secs: 60,
            lookback_blocks: 2_000,
            default_count: 5,
        }
    }
}

/// Retry policies for every class of outbound call.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryPolicies {
    pub query: RetryPolicy,
    pub connect: RetryPolicy,
    pub rpc: RetryPolicy,
    pub logs: RetryPolicy,
    pub http: RetryPolicy,
}

impl Default for RetryPolicies {
    fn default() -> Self {
        Self {
            query: RetryPolicy::QUERY,
            connect: RetryPolicy::CONNECT,
            rpc: RetryPolicy::RPC,
            logs: RetryPolicy::LOGS,
            http: RetryPolicy::HTTP,
        }
    }
}

impl RetryPolicies {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &RetryPolicy)> {
        [
            ("query", &self.query),
            ("connect", &self.connect),
            ("rpc", &self.rpc),
            ("logs", &self.logs),
            ("http", &self.http),
        ]
        .into_iter()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config: TelemetryConfig = toml::from_str(
            r#"
            [providers]
            "1" = "https://eth.example.org"

            [deployments]
            "1" = "0xd7CA5BD7a45985D271F216Cb1CAD82348464f6d5"
            "#,
        )
        .unwrap();

        assert_eq!(config.providers.len(), 1);
        assert!(config.database.is_none());
        assert_eq!(config.transactions.max_age_secs, 60);
        assert_eq!(config.retries.query, RetryPolicy::QUERY);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_chain_lookup_by_numeric_value() {
        let mut config = TelemetryConfig::default();
        config
            .providers
            .insert("137".to_string(), "https://polygon.example.org".to_string());
        config
            .deployments
            .insert("0137".to_string(), "0xd7CA5BD7a45985D271F216Cb1CAD82348464f6d5".to_string());

        assert_eq!(config.provider_for(ChainId(137)), Some("https://polygon.example.org"));
        assert!(config.deployment_for(ChainId(137)).is_some());
        assert!(config.provider_for(ChainId(1)).is_none());
    }

    #[test]
    fn test_retry_override() {
        let config: TelemetryConfig = toml::from_str(
            r#"
            [retries.query]
            attempt_timeout_ms = 1000
            retries = 0
            total_timeout_ms = 1000
            "#,
        )
        .unwrap();

        assert_eq!(config.retries.query.retries, 0);
        assert_eq!(config.retries.rpc, RetryPolicy::RPC);
    }

    #[test]
    fn test_database_defaults() {
        let config: TelemetryConfig = toml::from_str(
            r#"
            [database]
            host = "db.internal"
            "#,
        )
        .unwrap();
        let db = config.database.unwrap();
        assert_eq!(db.host, "db.internal");
        assert_eq!(db.port, 65432);
        assert!(db.tls);
    }
}
