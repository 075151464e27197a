//! API3 oracle telemetry API.
//!
//! Serves coin prices, beacon volatility, on-chain data feed values and recent
//! beacon update transactions over HTTP. Every database, RPC and CoinGecko call
//! goes through the bounded-retry wrapper in [`resilience`].

// Core subsystems
pub mod chain;
pub mod config;
pub mod http;
pub mod store;

// Background work
pub mod jobs;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::TelemetryConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
