//! `GET /last-transactions?chainId=&beaconId=|dapiName=&transactionCountLimit=`

use alloy::primitives::B256;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use super::{connect_store, present};
use crate::chain::{dapi_name_to_bytes32, parse_bytes32, BeaconUpdate, ChainId};
use crate::http::response::{messages, ApiError, ApiResult};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::resilience::execute;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastTransactionsParams {
    pub chain_id: Option<String>,
    pub beacon_id: Option<String>,
    pub dapi_name: Option<String>,
    pub transaction_count_limit: Option<String>,
}

enum Target {
    Beacon(B256),
    DapiName(String),
}

/// Newest beacon updates for one beacon on one chain.
///
/// Refreshes the shared transaction log first when it is older than the
/// configured max age.
pub async fn last_transactions(
    State(state): State<AppState>,
    Query(params): Query<LastTransactionsParams>,
) -> ApiResult<Json<Vec<BeaconUpdate>>> {
    let beacon = present(params.beacon_id)
        .map(|id| parse_bytes32(&id).ok_or(ApiError::BadRequest(messages::BEACON_ID_REQUIRED)))
        .transpose()?;

    let target = match (beacon, present(params.dapi_name)) {
        (Some(beacon), _) => Target::Beacon(beacon),
        (None, Some(name)) => Target::DapiName(name),
        (None, None) => return Err(ApiError::BadRequest(messages::BEACON_ID_REQUIRED)),
    };

    let chain: ChainId = present(params.chain_id)
        .and_then(|id| id.parse().ok())
        .ok_or(ApiError::BadRequest(messages::CHAIN_ID_REQUIRED))?;

    let beacon = match target {
        Target::Beacon(beacon) => beacon,
        Target::DapiName(name) => resolve_dapi_name(&state, chain, &name).await?,
    };

    let limit = params
        .transaction_count_limit
        .and_then(|limit| limit.trim().parse::<usize>().ok())
        .unwrap_or(state.config.transactions.default_count);

    if state.transactions.is_stale() {
        state
            .transactions
            .refresh(state.chain.as_ref(), &state.config.retries.logs)
            .await
            .map_err(|error| {
                tracing::error!(error = %error, "Transaction log refresh failed");
                ApiError::Internal(messages::TRANSACTION_LOGS)
            })?;
    }

    Ok(Json(state.transactions.latest_for(chain, beacon, limit)))
}

/// Data feed id most recently assigned to `name` on `chain`.
async fn resolve_dapi_name(state: &AppState, chain: ChainId, name: &str) -> ApiResult<B256> {
    let encoded = match parse_bytes32(name) {
        Some(encoded) => encoded,
        None => dapi_name_to_bytes32(name)
            .map_err(|_| ApiError::BadRequest(messages::DAPI_NAME_UNKNOWN))?,
    };

    connect_store(state).await?;

    let chain_key = chain.to_string();
    let encoded_key = encoded.to_string();
    let outcome = execute(
        || state.store.data_feed_id_for_dapi_name(&chain_key, &encoded_key),
        &state.config.retries.query,
    )
    .await;
    metrics::record_outbound_call("dapi_name_lookup", outcome.label());

    let data_feed_id = outcome.into_result().map_err(|error| {
        tracing::error!(chain_id = %chain, dapi_name = %name, error = %error, "dAPI name lookup failed");
        ApiError::Internal(messages::DAPI_NAME_QUERY)
    })?;

    data_feed_id
        .as_deref()
        .and_then(parse_bytes32)
        .ok_or_else(|| {
            tracing::warn!(chain_id = %chain, dapi_name = %name, "No data feed id for dAPI name");
            ApiError::BadRequest(messages::DAPI_NAME_UNKNOWN)
        })
}
