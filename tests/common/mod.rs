//! Shared fakes and helpers for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::B256;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use oracle_telemetry_api::chain::{
    BeaconEventKind, BeaconReading, BeaconUpdate, ChainError, ChainId, ChainResult,
    DataFeedQuery, DataFeedSource,
};
use oracle_telemetry_api::config::TelemetryConfig;
use oracle_telemetry_api::http::{AppState, HttpServer};
use oracle_telemetry_api::resilience::RetryPolicy;
use oracle_telemetry_api::store::{BeaconDeviation, CoinValue, StoreError, TelemetryStore};

pub const DAPI_SERVER: &str = "0xd7CA5BD7a45985D271F216Cb1CAD82348464f6d5";
pub const BEACON: &str = "0x09a5873667837598bd0990ba2f53d750d545ce435ecdcd44e0b4c64ab7d7d20d";

/// Config with chain 1 fully configured and short retry bounds.
pub fn test_config() -> TelemetryConfig {
    let mut config = TelemetryConfig::default();
    config
        .headers
        .insert("Access-Control-Allow-Origin".to_string(), "*".to_string());
    config
        .providers
        .insert("1".to_string(), "http://localhost:8545".to_string());
    config
        .deployments
        .insert("1".to_string(), DAPI_SERVER.to_string());
    config
        .providers
        .insert("10".to_string(), "http://localhost:9545".to_string());

    let fast = RetryPolicy::new(200, 2, 2_000);
    config.retries.query = fast;
    config.retries.rpc = fast;
    config.retries.logs = fast;
    config.retries.http = fast;
    config.retries.connect = RetryPolicy::new(200, 1, 2_000);
    config
}

pub fn app(store: Arc<FakeStore>, chain: Arc<FakeChain>) -> Router {
    app_with_config(test_config(), store, chain)
}

pub fn app_with_config(config: TelemetryConfig, store: Arc<FakeStore>, chain: Arc<FakeChain>) -> Router {
    HttpServer::new(AppState::new(config, store, chain)).router()
}

/// Issue a GET and decode the JSON body.
pub async fn get(router: Router, uri: &str) -> (StatusCode, HeaderMap, serde_json::Value) {
    let response = router
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, headers, body)
}

pub fn beacon() -> B256 {
    BEACON.parse().unwrap()
}

pub fn update(block: u64, beacon_id: B256) -> BeaconUpdate {
    BeaconUpdate {
        block_number: block,
        transaction_hash: Some(B256::with_last_byte(block as u8)),
        topics: vec![beacon_id],
        event: BeaconEventKind::UpdatedBeaconWithSignedData,
        beacon_id,
        value: (1_000 + block).to_string(),
        timestamp: 1_700_000_000 + block,
        subscription_id: None,
    }
}

/// In-memory [`TelemetryStore`] with call counters and switchable failures.
#[derive(Default)]
pub struct FakeStore {
    pub fail_connect: AtomicBool,
    pub fail_queries: AtomicBool,
    pub connect_calls: AtomicU32,
    pub query_calls: AtomicU32,
    pub coins: Mutex<HashMap<String, CoinValue>>,
    pub deviations: Mutex<Vec<BeaconDeviation>>,
    pub dapi_names: Mutex<HashMap<(String, String), String>>,
    pub coingecko_ids: Mutex<Vec<String>>,
    pub updates: Mutex<Vec<(Vec<String>, Vec<f64>)>>,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn query(&self) -> Result<(), StoreError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries.load(Ordering::SeqCst) {
            Err(StoreError::NotConnected)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TelemetryStore for FakeStore {
    async fn connect(&self) -> Result<(), StoreError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            Err(StoreError::NotConnected)
        } else {
            Ok(())
        }
    }

    async fn coin_value(&self, symbol: &str) -> Result<Option<CoinValue>, StoreError> {
        self.query()?;
        Ok(self.coins.lock().unwrap().get(symbol).cloned())
    }

    async fn coingecko_ids(&self) -> Result<Vec<String>, StoreError> {
        self.query()?;
        Ok(self.coingecko_ids.lock().unwrap().clone())
    }

    async fn update_coin_values(&self, symbols: &[String], values: &[f64]) -> Result<u64, StoreError> {
        self.query()?;
        self.updates
            .lock()
            .unwrap()
            .push((symbols.to_vec(), values.to_vec()));
        Ok(symbols.len() as u64)
    }

    async fn beacon_deviations(
        &self,
        _beacon_id: &str,
        _chain_id: &str,
    ) -> Result<Vec<BeaconDeviation>, StoreError> {
        self.query()?;
        Ok(self.deviations.lock().unwrap().clone())
    }

    async fn data_feed_id_for_dapi_name(
        &self,
        chain_id: &str,
        dapi_name: &str,
    ) -> Result<Option<String>, StoreError> {
        self.query()?;
        Ok(self
            .dapi_names
            .lock()
            .unwrap()
            .get(&(chain_id.to_string(), dapi_name.to_string()))
            .cloned())
    }
}

/// In-memory [`DataFeedSource`] serving chain 1.
pub struct FakeChain {
    pub reading: Mutex<Option<BeaconReading>>,
    pub reads: Mutex<Vec<(ChainId, DataFeedQuery)>>,
    pub latest_block: u64,
    pub logs: Mutex<HashMap<ChainId, Vec<BeaconUpdate>>>,
    pub fail_logs: AtomicBool,
    pub log_calls: AtomicU32,
    pub from_blocks: Mutex<Vec<u64>>,
}

impl Default for FakeChain {
    fn default() -> Self {
        Self {
            reading: Mutex::new(None),
            reads: Mutex::new(Vec::new()),
            latest_block: 100,
            logs: Mutex::new(HashMap::new()),
            fail_logs: AtomicBool::new(false),
            log_calls: AtomicU32::new(0),
            from_blocks: Mutex::new(Vec::new()),
        }
    }
}

impl FakeChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_reading(value: &str, timestamp: u32) -> Arc<Self> {
        let chain = Self::default();
        *chain.reading.lock().unwrap() = Some(BeaconReading {
            value: value.to_string(),
            timestamp,
        });
        Arc::new(chain)
    }

    pub fn push_logs(&self, chain: ChainId, updates: Vec<BeaconUpdate>) {
        self.logs.lock().unwrap().entry(chain).or_default().extend(updates);
    }
}

#[async_trait]
impl DataFeedSource for FakeChain {
    fn chains(&self) -> Vec<ChainId> {
        vec![ChainId(1)]
    }

    async fn read_data_feed(&self, chain: ChainId, query: &DataFeedQuery) -> ChainResult<BeaconReading> {
        self.reads.lock().unwrap().push((chain, query.clone()));
        self.reading
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ChainError::Contract("execution reverted".to_string()))
    }

    async fn latest_block(&self, _chain: ChainId) -> ChainResult<u64> {
        Ok(self.latest_block)
    }

    async fn beacon_updates(&self, chain: ChainId, from_block: u64) -> ChainResult<Vec<BeaconUpdate>> {
        self.log_calls.fetch_add(1, Ordering::SeqCst);
        self.from_blocks.lock().unwrap().push(from_block);
        if self.fail_logs.load(Ordering::SeqCst) {
            return Err(ChainError::Rpc("connection refused".to_string()));
        }
        Ok(self
            .logs
            .lock()
            .unwrap()
            .get(&chain)
            .map(|logs| {
                logs.iter()
                    .filter(|u| u.block_number >= from_block)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
