//! Chain-specific types and error definitions.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Chain ID type for strong typing.
///
/// Parsed from decimal strings because query parameters and config keys are strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl FromStr for ChainId {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ChainError::InvalidChainId(s.to_string()));
        }
        s.parse::<u64>()
            .map(ChainId)
            .map_err(|_| ChainError::InvalidChainId(s.to_string()))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur during on-chain reads.
#[derive(Debug, Error)]
pub enum ChainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The contract call reverted or returned undecodable data.
    #[error("Contract call failed: {0}")]
    Contract(String),

    /// No provider or DapiServer configured for the chain.
    #[error("Chain {0} is not configured")]
    UnknownChain(ChainId),

    #[error("Invalid chain id: {0}")]
    InvalidChainId(String),

    /// dAPI names are encoded as bytes32 and must fit in 31 bytes.
    #[error("dAPI name '{0}' does not fit in bytes32")]
    InvalidDapiName(String),

    #[error("Invalid RPC URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// How a data feed is addressed on the DapiServer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataFeedQuery {
    /// A beacon or beacon set id.
    Id(B256),
    /// A bytes32-encoded dAPI name.
    DapiName(B256),
}

/// Value and timestamp stored for a data feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconReading {
    /// Signed 224-bit value, rendered in decimal.
    pub value: String,
    pub timestamp: u32,
}

/// Which DapiServer event produced an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeaconEventKind {
    UpdatedBeaconWithSignedData,
    UpdatedBeaconWithPsp,
}

/// A decoded beacon update log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconUpdate {
    pub block_number: u64,
    pub transaction_hash: Option<B256>,
    pub topics: Vec<B256>,
    pub event: BeaconEventKind,
    pub beacon_id: B256,
    pub value: String,
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<B256>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_conversion() {
        let chain_id = ChainId::from(1u64);
        assert_eq!(chain_id.0, 1);
        assert_eq!(u64::from(chain_id), 1);
        assert_eq!(chain_id.to_string(), "1");
    }

    #[test]
    fn test_chain_id_parsing() {
        assert_eq!("137".parse::<ChainId>().unwrap(), ChainId(137));
        assert!("".parse::<ChainId>().is_err());
        assert!("-1".parse::<ChainId>().is_err());
        assert!("+5".parse::<ChainId>().is_err());
        assert!("0x1".parse::<ChainId>().is_err());
        assert!("99999999999999999999999".parse::<ChainId>().is_err());
    }

    #[test]
    fn test_error_display() {
        let err = ChainError::UnknownChain(ChainId(30));
        assert_eq!(err.to_string(), "Chain 30 is not configured");
    }
}
