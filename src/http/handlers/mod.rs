//! Request handlers.
//!
//! Each handler validates its query string, then reaches the database or the
//! chain only through [`crate::resilience::execute`] with the matching policy
//! from `[retries]`.

mod chain_value;
mod coin_value;
mod health;
mod last_transactions;
mod volatility;

pub use chain_value::{chain_value, ChainValueParams, ChainValueResponse};
pub use coin_value::{coin_value, CoinValueParams};
pub use health::{health, HealthResponse};
pub use last_transactions::{last_transactions, LastTransactionsParams};
pub use volatility::{volatility, VolatilityParams};

use crate::http::response::{messages, ApiError, ApiResult};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::resilience::execute;

/// Establish the database session, mapping any failure to the initialization error.
async fn connect_store(state: &AppState) -> ApiResult<()> {
    let outcome = execute(|| state.store.connect(), &state.config.retries.connect).await;
    metrics::record_outbound_call("db_connect", outcome.label());

    outcome.into_result().map_err(|error| {
        tracing::error!(error = %error, "Failed to initialize the database");
        ApiError::Internal(messages::DATABASE_INIT)
    })
}

/// Query values that are absent or empty count as missing.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
