//! Error responses.
//!
//! Every failure leaves a handler as `{"error": "<message>"}` with the status
//! attached to the variant. Messages are part of the public contract.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub mod messages {
    pub const SYMBOL_REQUIRED: &str = "Symbol required - Symbol is either not present or invalid";
    pub const DATABASE_INIT: &str = "An error has occurred while trying to initialize the database";
    pub const SYMBOL_QUERY: &str = "An error has occurred while querying the symbol value";
    pub const SYMBOL_NOT_FOUND: &str = "Value not found for the given symbol";

    pub const VOLATILITY_PARAMS_REQUIRED: &str =
        "Beaconid and chainId required - both values must be present";
    pub const INVALID_BEACON_ID: &str = "Invalid beaconId";
    pub const INVALID_CHAIN_ID: &str = "Invalid ChainId";
    pub const VOLATILITY_QUERY: &str = "An error has occurred while querying volatility";
    pub const EMPTY_RESULT: &str = "The query did not return any value";

    pub const INVALID_QUERY_PARAMETERS: &str = "Invalid query parameters";
    pub const MISSING_DATA_FEED_PARAMETERS: &str =
        "Missing query parameters - we need either a datafeedId or both an airnodeAddress and templateId or a dapiName";
    pub const NO_PROVIDER: &str = "We don't have a provider for that chainId";
    pub const NO_DAPI_SERVER: &str = "We don't have a dapiServer for that chainId";

    pub const BEACON_ID_REQUIRED: &str = "beaconId required - beaconId is either not present or invalid";
    pub const CHAIN_ID_REQUIRED: &str = "chainId required - chainId is either not present or invalid";
    pub const DAPI_NAME_UNKNOWN: &str = "Could not find dataFeedId for the given dapiName";
    pub const DAPI_NAME_QUERY: &str = "An error has occurred while resolving the dapiName";
    pub const TRANSACTION_LOGS: &str = "Something went wrong while retrieving transaction logs";
}

/// Handler failure mapped onto an HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
