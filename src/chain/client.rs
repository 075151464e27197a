//! DapiServer reads over JSON-RPC.
//!
//! # Responsibilities
//! - Hold one provider and one DapiServer address per configured chain
//! - Read data feed values by id or dAPI name
//! - Scan and decode beacon update logs
//!
//! Timeouts and retries are not applied here; callers wrap each call in
//! [`crate::resilience::execute`].

use std::collections::HashMap;

use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, B256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::eth::{Filter, Log};
use alloy::sol;
use async_trait::async_trait;

use crate::chain::types::{
    BeaconEventKind, BeaconReading, BeaconUpdate, ChainError, ChainId, ChainResult,
    DataFeedQuery,
};
use crate::config::TelemetryConfig;

sol! {
    #[sol(rpc)]
    interface DapiServer {
        function readDataFeedWithId(bytes32 dataFeedId) external view returns (int224 value, uint32 timestamp);
        function readDataFeedWithDapiName(bytes32 dapiName) external view returns (int224 value, uint32 timestamp);

        #[derive(Debug)]
        event UpdatedBeaconWithSignedData(bytes32 indexed beaconId, int256 value, uint256 timestamp);

        #[derive(Debug)]
        event UpdatedBeaconWithPsp(bytes32 indexed beaconId, bytes32 subscriptionId, int224 value, uint32 timestamp);
    }
}

/// Source of on-chain data feed values and update history.
#[async_trait]
pub trait DataFeedSource: Send + Sync {
    /// Chains that have both a provider and a DapiServer deployment.
    fn chains(&self) -> Vec<ChainId>;

    async fn read_data_feed(&self, chain: ChainId, query: &DataFeedQuery) -> ChainResult<BeaconReading>;

    async fn latest_block(&self, chain: ChainId) -> ChainResult<u64>;

    /// Beacon update logs emitted by the chain's DapiServer from `from_block` to latest.
    async fn beacon_updates(&self, chain: ChainId, from_block: u64) -> ChainResult<Vec<BeaconUpdate>>;
}

#[derive(Clone)]
struct ChainEndpoint {
    provider: DynProvider,
    dapi_server: Address,
}

/// [`DataFeedSource`] backed by alloy HTTP providers.
#[derive(Clone)]
pub struct RpcDataFeedSource {
    endpoints: HashMap<ChainId, ChainEndpoint>,
}

impl RpcDataFeedSource {
    /// Build providers for every chain listed in `deployments`.
    ///
    /// Providers connect lazily; no RPC traffic happens here.
    pub fn from_config(config: &TelemetryConfig) -> ChainResult<Self> {
        let mut endpoints = HashMap::new();

        for (chain, address) in &config.deployments {
            let chain_id: ChainId = chain.parse()?;
            let Some(rpc_url) = config.provider_for(chain_id) else {
                tracing::warn!(chain_id = %chain_id, "DapiServer configured without provider, skipping");
                continue;
            };
            let url: url::Url = rpc_url.parse().map_err(|e: url::ParseError| ChainError::InvalidUrl {
                url: rpc_url.to_string(),
                reason: e.to_string(),
            })?;
            let dapi_server: Address = address
                .parse()
                .map_err(|_| ChainError::Contract(format!("invalid DapiServer address {}", address)))?;

            let provider = ProviderBuilder::new().connect_http(url).erased();
            endpoints.insert(chain_id, ChainEndpoint { provider, dapi_server });
        }

        tracing::info!(chains = endpoints.len(), "Chain providers initialized");
        Ok(Self { endpoints })
    }

    fn endpoint(&self, chain: ChainId) -> ChainResult<&ChainEndpoint> {
        self.endpoints.get(&chain).ok_or(ChainError::UnknownChain(chain))
    }
}

#[async_trait]
impl DataFeedSource for RpcDataFeedSource {
    fn chains(&self) -> Vec<ChainId> {
        let mut chains: Vec<_> = self.endpoints.keys().copied().collect();
        chains.sort();
        chains
    }

    async fn read_data_feed(&self, chain: ChainId, query: &DataFeedQuery) -> ChainResult<BeaconReading> {
        let endpoint = self.endpoint(chain)?;
        let contract = DapiServer::new(endpoint.dapi_server, endpoint.provider.clone());

        let (value, timestamp) = match query {
            DataFeedQuery::Id(id) => {
                let ret = contract
                    .readDataFeedWithId(*id)
                    .call()
                    .await
                    .map_err(|e| ChainError::Contract(e.to_string()))?;
                (ret.value, ret.timestamp)
            }
            DataFeedQuery::DapiName(name) => {
                let ret = contract
                    .readDataFeedWithDapiName(*name)
                    .call()
                    .await
                    .map_err(|e| ChainError::Contract(e.to_string()))?;
                (ret.value, ret.timestamp)
            }
        };

        Ok(BeaconReading {
            value: value.to_string(),
            timestamp,
        })
    }

    async fn latest_block(&self, chain: ChainId) -> ChainResult<u64> {
        self.endpoint(chain)?
            .provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn beacon_updates(&self, chain: ChainId, from_block: u64) -> ChainResult<Vec<BeaconUpdate>> {
        let endpoint = self.endpoint(chain)?;
        let filter = Filter::new()
            .address(endpoint.dapi_server)
            .from_block(from_block)
            .to_block(BlockNumberOrTag::Latest);

        let logs = endpoint
            .provider
            .get_logs(&filter)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        Ok(logs.iter().filter_map(decode_beacon_update).collect())
    }
}

impl std::fmt::Debug for RpcDataFeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcDataFeedSource")
            .field("chains", &self.chains())
            .finish()
    }
}

/// Decode a DapiServer log into a beacon update; other events yield `None`.
fn decode_beacon_update(log: &Log) -> Option<BeaconUpdate> {
    let block_number = log.block_number?;
    let transaction_hash = log.transaction_hash;
    let topics: Vec<B256> = log.topics().to_vec();

    if let Ok(decoded) = log.log_decode::<DapiServer::UpdatedBeaconWithSignedData>() {
        let event = decoded.inner;
        return Some(BeaconUpdate {
            block_number,
            transaction_hash,
            topics,
            event: BeaconEventKind::UpdatedBeaconWithSignedData,
            beacon_id: event.beaconId,
            value: event.value.to_string(),
            timestamp: event.timestamp.saturating_to::<u64>(),
            subscription_id: None,
        });
    }

    if let Ok(decoded) = log.log_decode::<DapiServer::UpdatedBeaconWithPsp>() {
        let event = decoded.inner;
        return Some(BeaconUpdate {
            block_number,
            transaction_hash,
            topics,
            event: BeaconEventKind::UpdatedBeaconWithPsp,
            beacon_id: event.beaconId,
            value: event.value.to_string(),
            timestamp: u64::from(event.timestamp),
            subscription_id: Some(event.subscriptionId),
        });
    }

    None
}
