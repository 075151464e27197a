//! On-chain data subsystem.
//!
//! # Data Flow
//! ```text
//! Query parameters (chainId, dataFeedId | airnodeAddress + templateId | dapiName)
//!     → encoding.rs (bytes32 dAPI names, packed beacon ids, strict hex)
//!     → client.rs (DapiServer reads and log scans through alloy providers)
//!     → types.rs (BeaconReading, BeaconUpdate)
//! ```
//!
//! # Constraints
//! - Read-only: no signer, no transactions
//! - Providers are built once from config; chains without a provider are skipped

pub mod client;
pub mod encoding;
pub mod types;

pub use client::{DataFeedSource, RpcDataFeedSource};
pub use encoding::{beacon_id, dapi_name_to_bytes32, parse_address, parse_bytes32};
pub use types::{
    BeaconEventKind, BeaconReading, BeaconUpdate, ChainError, ChainId, ChainResult, DataFeedQuery,
};
