//! Persistence subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers / jobs
//!     → TelemetryStore (types.rs trait)
//!         → PgStore (postgres.rs, tokio-postgres, fixed statement templates)
//!         → UnconfiguredStore (no database section)
//!     → TransactionStore (transactions.rs, in-memory beacon update log)
//! ```
//!
//! # Design Decisions
//! - Every statement is a constant template with positional parameters
//! - Schema is owned elsewhere; no DDL is issued from here
//! - Handlers see the store only through the trait, so tests inject fakes

pub mod postgres;
pub mod transactions;
pub mod types;

pub use postgres::PgStore;
pub use transactions::{RefreshError, RefreshSummary, TransactionStore};
pub use types::{BeaconDeviation, CoinValue, StoreError, TelemetryStore, UnconfiguredStore};
