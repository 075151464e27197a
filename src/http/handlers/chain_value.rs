//! `GET /chain-value?chainId=&dataFeedId=|airnodeAddress=&templateId=|dapiName=`

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::present;
use crate::chain::{
    beacon_id, dapi_name_to_bytes32, parse_address, parse_bytes32, BeaconReading, ChainId,
    DataFeedQuery,
};
use crate::http::response::{messages, ApiError, ApiResult};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::resilience::{execute, Outcome};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainValueParams {
    pub chain_id: Option<String>,
    pub data_feed_id: Option<String>,
    pub template_id: Option<String>,
    pub airnode_address: Option<String>,
    pub dapi_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainValueResponse {
    pub error: bool,
    pub beacon_response: Option<BeaconReading>,
}

/// Read a data feed straight from the chain's DapiServer.
///
/// A failed read still answers with the JSON envelope, `error: true` and
/// status 500.
pub async fn chain_value(
    State(state): State<AppState>,
    Query(params): Query<ChainValueParams>,
) -> ApiResult<Response> {
    let chain_key = present(params.chain_id)
        .ok_or(ApiError::BadRequest(messages::INVALID_QUERY_PARAMETERS))?;
    let chain: ChainId = chain_key
        .parse()
        .map_err(|_| ApiError::BadRequest(messages::INVALID_QUERY_PARAMETERS))?;

    let query = data_feed_query(
        present(params.dapi_name),
        present(params.data_feed_id),
        present(params.airnode_address),
        present(params.template_id),
    )?;

    if state.config.provider_for(chain).is_none() {
        return Err(ApiError::Internal(messages::NO_PROVIDER));
    }
    if state.config.deployment_for(chain).is_none() {
        return Err(ApiError::Internal(messages::NO_DAPI_SERVER));
    }

    let outcome = execute(
        || state.chain.read_data_feed(chain, &query),
        &state.config.retries.rpc,
    )
    .await;
    metrics::record_outbound_call("read_data_feed", outcome.label());

    let (status, body) = match outcome {
        Outcome::Success { data } => (
            StatusCode::OK,
            ChainValueResponse {
                error: false,
                beacon_response: Some(data),
            },
        ),
        Outcome::Failure { error } => {
            tracing::error!(chain_id = %chain, query = ?query, error = %error, "Data feed read failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ChainValueResponse {
                    error: true,
                    beacon_response: None,
                },
            )
        }
    };

    Ok((status, Json(body)).into_response())
}

/// Resolve the feed to read: dAPI name first, then data feed id, then the
/// beacon id derived from an Airnode address and template id.
///
/// `dapiName` may be the plain name or its bytes32 encoding.
fn data_feed_query(
    dapi_name: Option<String>,
    data_feed_id: Option<String>,
    airnode_address: Option<String>,
    template_id: Option<String>,
) -> ApiResult<DataFeedQuery> {
    let invalid = ApiError::BadRequest(messages::INVALID_QUERY_PARAMETERS);

    if let Some(name) = dapi_name {
        let encoded = match parse_bytes32(&name) {
            Some(encoded) => encoded,
            None => dapi_name_to_bytes32(&name).map_err(|_| invalid)?,
        };
        return Ok(DataFeedQuery::DapiName(encoded));
    }

    if let Some(id) = data_feed_id {
        return parse_bytes32(&id).map(DataFeedQuery::Id).ok_or(invalid);
    }

    match (airnode_address, template_id) {
        (Some(airnode), Some(template)) => {
            let airnode = parse_address(&airnode).ok_or(invalid.clone())?;
            let template = parse_bytes32(&template).ok_or(invalid)?;
            Ok(DataFeedQuery::Id(beacon_id(airnode, template)))
        }
        _ => Err(ApiError::BadRequest(messages::MISSING_DATA_FEED_PARAMETERS)),
    }
}
