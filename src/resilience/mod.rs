//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call (SQL query, JSON-RPC read, HTTP fetch):
//!     → caller closes over its parameters
//!     → retry.rs (attempt timeout, fixed retries, static delay, total budget)
//!     → Outcome::Success / Outcome::Failure returned as data
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - One wrapper, one policy value per call site
//! - Failure is a value; the caller decides status code and logging

pub mod retry;

pub use retry::{execute, AttemptError, Outcome, RetryDelay, RetryPolicy};
