//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! telemetry.toml ($TELEMETRY_CONFIG or --config)
//!     → loader.rs (parse & deserialize, POSTGRES_* overrides)
//!     → validation.rs (semantic checks)
//!     → TelemetryConfig (validated, immutable)
//!     → shared via Arc to handlers and jobs
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Database credentials may come from the environment only

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve_config_path, ConfigError};
pub use schema::{
    CoinGeckoConfig, DatabaseConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    RetryPolicies, TelemetryConfig, TransactionsConfig,
};
