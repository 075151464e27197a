//! `GET /coin-value?symbol=`

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use super::connect_store;
use crate::http::response::{messages, ApiError, ApiResult};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::resilience::execute;
use crate::store::CoinValue;

#[derive(Debug, Default, Deserialize)]
pub struct CoinValueParams {
    pub symbol: Option<String>,
}

/// Latest stored USD value for `symbol`.
pub async fn coin_value(
    State(state): State<AppState>,
    Query(params): Query<CoinValueParams>,
) -> ApiResult<Json<CoinValue>> {
    let symbol = params
        .symbol
        .ok_or(ApiError::BadRequest(messages::SYMBOL_REQUIRED))?;

    connect_store(&state).await?;

    let outcome = execute(|| state.store.coin_value(&symbol), &state.config.retries.query).await;
    metrics::record_outbound_call("coin_value", outcome.label());

    let row = outcome.into_result().map_err(|error| {
        tracing::error!(symbol = %symbol, error = %error, "Coin value query failed");
        ApiError::Internal(messages::SYMBOL_QUERY)
    })?;

    row.map(Json)
        .ok_or(ApiError::BadRequest(messages::SYMBOL_NOT_FOUND))
}
