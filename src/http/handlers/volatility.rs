//! `GET /volatility?beaconId=&chainId=`

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use super::{connect_store, present};
use crate::chain::{parse_bytes32, ChainId};
use crate::http::response::{messages, ApiError, ApiResult};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::resilience::execute;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolatilityParams {
    pub beacon_id: Option<String>,
    pub chain_id: Option<String>,
}

/// Deviation samples of the last 12 hours as `[[epochMillis, deviation], ...]`.
pub async fn volatility(
    State(state): State<AppState>,
    Query(params): Query<VolatilityParams>,
) -> ApiResult<Json<Vec<(i64, f64)>>> {
    let (Some(beacon_id), Some(chain_id)) = (present(params.beacon_id), present(params.chain_id)) else {
        return Err(ApiError::BadRequest(messages::VOLATILITY_PARAMS_REQUIRED));
    };

    if parse_bytes32(&beacon_id).is_none() {
        return Err(ApiError::BadRequest(messages::INVALID_BEACON_ID));
    }
    if chain_id.parse::<ChainId>().is_err() {
        return Err(ApiError::BadRequest(messages::INVALID_CHAIN_ID));
    }

    connect_store(&state).await?;

    let outcome = execute(
        || state.store.beacon_deviations(&beacon_id, &chain_id),
        &state.config.retries.query,
    )
    .await;
    metrics::record_outbound_call("beacon_deviations", outcome.label());

    let rows = outcome.into_result().map_err(|error| {
        tracing::error!(beacon_id = %beacon_id, chain_id = %chain_id, error = %error, "Volatility query failed");
        ApiError::Internal(messages::VOLATILITY_QUERY)
    })?;

    if rows.is_empty() {
        return Err(ApiError::BadRequest(messages::EMPTY_RESULT));
    }

    Ok(Json(
        rows.into_iter()
            .map(|row| (row.time.timestamp_millis(), row.deviation))
            .collect(),
    ))
}
