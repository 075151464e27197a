//! Background jobs.
//!
//! # Data Flow
//! ```text
//! interval tick (or `refresh-coins` CLI)
//!     → coin_refresh.rs (CoinGecko ids from store → /coins/markets → bulk update)
//! ```

pub mod coin_refresh;

pub use coin_refresh::{CoinGeckoApiResult, CoinRefreshError, CoinRefresher};
