//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with every handler
//! - Wire up middleware (request ID, tracing, timeout, response headers, metrics)
//! - Serve on a bound listener until shutdown is signalled

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{MatchedPath, Request},
    http::{HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::chain::DataFeedSource;
use crate::config::TelemetryConfig;
use crate::http::handlers;
use crate::http::request::{request_id, MakeRequestUuid, X_REQUEST_ID};
use crate::observability::metrics;
use crate::store::{TelemetryStore, TransactionStore};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<TelemetryConfig>,
    pub store: Arc<dyn TelemetryStore>,
    pub chain: Arc<dyn DataFeedSource>,
    pub transactions: Arc<TransactionStore>,
}

impl AppState {
    pub fn new(
        config: TelemetryConfig,
        store: Arc<dyn TelemetryStore>,
        chain: Arc<dyn DataFeedSource>,
    ) -> Self {
        let transactions = Arc::new(TransactionStore::from_config(&config.transactions));
        Self {
            config: Arc::new(config),
            store,
            chain,
            transactions,
        }
    }
}

/// HTTP server for the telemetry API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: build_router(state),
        }
    }

    /// The fully layered router, for serving or for driving with `oneshot`.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(state.config.listener.request_timeout_secs);
    let headers = response_headers(&state.config);

    let mut router = Router::new()
        .route("/coin-value", get(handlers::coin_value))
        .route("/volatility", get(handlers::volatility))
        .route("/chain-value", get(handlers::chain_value))
        .route("/last-transactions", get(handlers::last_transactions))
        .route("/health", get(handlers::health))
        .route_layer(middleware::from_fn(track_metrics))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout));

    for (name, value) in headers {
        router = router.layer(SetResponseHeaderLayer::overriding(name, value));
    }

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id(request),
                )
            }))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
    )
}

/// Configured response headers; entries that fail to parse were rejected by validation.
fn response_headers(config: &TelemetryConfig) -> Vec<(HeaderName, HeaderValue)> {
    config
        .headers
        .iter()
        .filter_map(|(name, value)| {
            Some((name.parse().ok()?, HeaderValue::from_str(value).ok()?))
        })
        .collect()
}

async fn track_metrics(matched: MatchedPath, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let route = matched.as_str().to_owned();

    let response = next.run(request).await;
    metrics::record_request(&route, response.status().as_u16(), start);
    response
}
