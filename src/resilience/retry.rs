//! Bounded retry execution.
//!
//! # Behavior
//! ```text
//! start ─▶ attempt (raced against attempt_timeout)
//!            ├─ Ok    → Success { data }
//!            └─ Err / timeout
//!                 ├─ retries left AND budget left → [static delay] → attempt
//!                 └─ otherwise                    → Failure { error }
//! ```
//!
//! # Design Decisions
//! - Attempts are strictly sequential; nothing runs speculatively
//! - The last error wins; earlier attempt errors are dropped
//! - A timed-out attempt is dropped, not joined; its side effects may still land
//! - The total budget is checked between attempts, never mid-flight
//! - No logging here; callers log the `Failure` they receive

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::{sleep, timeout, Instant};

/// Smallest slice of budget a new attempt must still have before it is started.
pub const MIN_ATTEMPT_BUDGET: Duration = Duration::from_millis(1);

/// Pause inserted between a failed attempt and the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RetryDelay {
    Static { delay_ms: u64 },
}

impl RetryDelay {
    pub fn duration(&self) -> Duration {
        match self {
            RetryDelay::Static { delay_ms } => Duration::from_millis(*delay_ms),
        }
    }
}

/// Bounds for a single call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Upper bound for one invocation of the operation.
    pub attempt_timeout_ms: u64,

    /// Additional attempts after the first (`2` allows three attempts).
    pub retries: u32,

    /// Wall-clock budget across all attempts and delays.
    pub total_timeout_ms: u64,

    /// Optional static pause between attempts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<RetryDelay>,
}

impl RetryPolicy {
    /// Database queries.
    pub const QUERY: Self = Self::new(5_000, 2, 15_000);

    /// Establishing and verifying a database session.
    pub const CONNECT: Self = Self::new(5_000, 0, 5_000);

    /// Contract reads over JSON-RPC.
    pub const RPC: Self = Self::new(5_000, 2, 15_000);

    /// Log scans can be slow on the initial lookback window.
    pub const LOGS: Self = Self::new(15_000, 2, 55_000).with_delay(5_000);

    /// Third-party HTTP APIs.
    pub const HTTP: Self = Self::new(10_000, 2, 30_000);

    pub const fn new(attempt_timeout_ms: u64, retries: u32, total_timeout_ms: u64) -> Self {
        Self {
            attempt_timeout_ms,
            retries,
            total_timeout_ms,
            delay: None,
        }
    }

    pub const fn with_delay(self, delay_ms: u64) -> Self {
        Self {
            delay: Some(RetryDelay::Static { delay_ms }),
            ..self
        }
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn total_timeout(&self) -> Duration {
        Duration::from_millis(self.total_timeout_ms)
    }

    pub fn delay(&self) -> Duration {
        self.delay.map(|d| d.duration()).unwrap_or(Duration::ZERO)
    }

    /// Upper bound on the number of invocations.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

/// Why a single attempt failed.
#[derive(Debug, Error)]
pub enum AttemptError<E> {
    /// The operation itself returned an error.
    #[error("{0}")]
    Operation(E),

    /// The attempt did not finish within the attempt timeout.
    #[error("attempt timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },
}

impl<E> AttemptError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, AttemptError::Timeout { .. })
    }

    /// The operation's own error, if that is what ended the last attempt.
    pub fn operation(&self) -> Option<&E> {
        match self {
            AttemptError::Operation(e) => Some(e),
            AttemptError::Timeout { .. } => None,
        }
    }
}

/// Terminal result of [`execute`].
#[derive(Debug)]
pub enum Outcome<T, E> {
    Success { data: T },
    Failure { error: E },
}

impl<T, E> Outcome<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Outcome::Success { data } => Ok(data),
            Outcome::Failure { error } => Err(error),
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::Failure { .. } => "failure",
        }
    }
}

impl<T, E> From<Outcome<T, E>> for Result<T, E> {
    fn from(outcome: Outcome<T, E>) -> Self {
        outcome.into_result()
    }
}

impl<T: fmt::Display, E: fmt::Display> fmt::Display for Outcome<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success { data } => write!(f, "success: {}", data),
            Outcome::Failure { error } => write!(f, "failure: {}", error),
        }
    }
}

/// Run `operation` under `policy`, returning the first success or the last failure.
pub async fn execute<T, E, F, Fut>(
    mut operation: F,
    policy: &RetryPolicy,
) -> Outcome<T, AttemptError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let started = Instant::now();
    let attempt_timeout = policy.attempt_timeout();
    let total_timeout = policy.total_timeout();
    let pause = policy.delay();
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let error = match timeout(attempt_timeout, operation()).await {
            Ok(Ok(data)) => return Outcome::Success { data },
            Ok(Err(e)) => AttemptError::Operation(e),
            Err(_) => AttemptError::Timeout {
                after: attempt_timeout,
            },
        };

        if attempt > policy.retries {
            return Outcome::Failure { error };
        }

        // The next attempt must start with budget to spare.
        let next_start = started.elapsed() + pause + MIN_ATTEMPT_BUDGET;
        if next_start > total_timeout {
            return Outcome::Failure { error };
        }

        if !pause.is_zero() {
            sleep(pause).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_policy_accessors() {
        let policy = RetryPolicy::new(100, 2, 1_000).with_delay(25);
        assert_eq!(policy.attempt_timeout(), Duration::from_millis(100));
        assert_eq!(policy.total_timeout(), Duration::from_secs(1));
        assert_eq!(policy.delay(), Duration::from_millis(25));
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(RetryPolicy::QUERY.delay(), Duration::ZERO);
    }

    #[test]
    fn test_policy_toml_shape() {
        let policy: RetryPolicy = toml::from_str(
            r#"
            attempt_timeout_ms = 15000
            retries = 2
            total_timeout_ms = 55000
            delay = { type = "static", delay_ms = 5000 }
            "#,
        )
        .unwrap();
        assert_eq!(policy, RetryPolicy::LOGS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_synchronous_failure_is_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let outcome = execute(
            move || {
                c.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Err::<(), _>("sync"))
            },
            &RetryPolicy::new(100, 1, 1_000),
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        match outcome {
            Outcome::Failure { error } => assert_eq!(error.operation(), Some(&"sync")),
            Outcome::Success { .. } => panic!("expected failure"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_error_display() {
        let outcome = execute(
            || std::future::pending::<Result<(), &str>>(),
            &RetryPolicy::new(250, 0, 1_000),
        )
        .await;
        let error = outcome.into_result().unwrap_err();
        assert!(error.is_timeout());
        assert_eq!(error.to_string(), "attempt timed out after 250ms");
    }

    #[test]
    fn test_outcome_into_result() {
        let ok: Outcome<u8, &str> = Outcome::Success { data: 7 };
        assert!(ok.is_success());
        assert_eq!(ok.label(), "success");
        let result: Result<u8, &str> = ok.into();
        assert_eq!(result, Ok(7));

        let err: Outcome<u8, &str> = Outcome::Failure { error: "nope" };
        assert_eq!(err.to_string(), "failure: nope");
        assert_eq!(err.into_result(), Err("nope"));
    }
}
