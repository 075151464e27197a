//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers, jobs, stores produce:
//!     → logging.rs (structured tracing events, pretty or JSON)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (log aggregation)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields, never formatted strings, for anything queryable
//! - Request ID flows from the request layer into handler spans
//! - Metrics are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
