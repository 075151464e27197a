//! In-memory beacon update log with an explicit freshness policy.
//!
//! # Responsibilities
//! - Keep decoded DapiServer updates per chain, newest first
//! - Report staleness from the last successful refresh and a max age
//! - Fetch only blocks newer than what is already held
//!
//! # Design Decisions
//! - Injected into handlers through `AppState`; no process-wide statics
//! - One refresh at a time; concurrent callers wait and then see fresh data
//! - A chain that fails to refresh keeps its previous entries
//! - Per-chain history is capped so a long-running process stays bounded

use std::cmp::Reverse;
use std::sync::Mutex;
use std::time::Duration;

use alloy::primitives::B256;
use dashmap::DashMap;
use futures_util::future::join_all;
use thiserror::Error;
use tokio::time::Instant;

use crate::chain::{BeaconUpdate, ChainError, ChainId, DataFeedSource};
use crate::config::TransactionsConfig;
use crate::observability::metrics;
use crate::resilience::{execute, AttemptError, Outcome, RetryPolicy};

/// Entries kept per chain.
pub const MAX_UPDATES_PER_CHAIN: usize = 10_000;

/// Errors surfaced by [`TransactionStore::refresh`].
#[derive(Debug, Error)]
pub enum RefreshError {
    /// Every configured chain failed; carries the last failure.
    #[error("no chain could be refreshed: {0}")]
    AllChainsFailed(AttemptError<ChainError>),
}

/// Result of one refresh pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub chains_refreshed: usize,
    pub chains_failed: usize,
    pub updates_added: usize,
}

/// Per-chain beacon update log.
pub struct TransactionStore {
    logs: DashMap<ChainId, Vec<BeaconUpdate>>,
    last_refreshed: Mutex<Option<Instant>>,
    refresh_lock: tokio::sync::Mutex<()>,
    max_age: Duration,
    lookback_blocks: u64,
}

impl TransactionStore {
    pub fn new(max_age: Duration, lookback_blocks: u64) -> Self {
        Self {
            logs: DashMap::new(),
            last_refreshed: Mutex::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
            max_age,
            lookback_blocks,
        }
    }

    pub fn from_config(config: &TransactionsConfig) -> Self {
        Self::new(
            Duration::from_secs(config.max_age_secs),
            config.lookback_blocks,
        )
    }

    pub fn last_refreshed(&self) -> Option<Instant> {
        *self
            .last_refreshed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// True when never refreshed or the last refresh is older than `max_age`.
    pub fn is_stale(&self) -> bool {
        match self.last_refreshed() {
            None => true,
            Some(at) => at.elapsed() > self.max_age,
        }
    }

    fn mark_refreshed(&self) {
        let mut guard = self
            .last_refreshed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(Instant::now());
    }

    /// Number of updates held for a chain.
    pub fn len(&self, chain: ChainId) -> usize {
        self.logs.get(&chain).map(|l| l.len()).unwrap_or(0)
    }

    /// Highest block held for a chain.
    pub fn newest_block(&self, chain: ChainId) -> Option<u64> {
        self.logs
            .get(&chain)
            .and_then(|l| l.first().map(|u| u.block_number))
    }

    /// Merge updates fetched for blocks newer than anything held.
    ///
    /// `updates` arrive in chain order (ascending); they are stored newest first.
    pub fn merge(&self, chain: ChainId, mut updates: Vec<BeaconUpdate>) -> usize {
        let added = updates.len();
        updates.reverse();
        updates.sort_by_key(|u| Reverse(u.block_number));

        let mut entry = self.logs.entry(chain).or_default();
        let existing = std::mem::take(entry.value_mut());
        updates.extend(existing);
        updates.truncate(MAX_UPDATES_PER_CHAIN);
        *entry.value_mut() = updates;

        metrics::record_cached_transactions(chain, entry.value().len());
        added
    }

    /// The newest `limit` updates for `beacon_id` on `chain`.
    pub fn latest_for(&self, chain: ChainId, beacon_id: B256, limit: usize) -> Vec<BeaconUpdate> {
        self.logs
            .get(&chain)
            .map(|l| {
                l.iter()
                    .filter(|u| u.beacon_id == beacon_id)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Pull new logs for every chain `source` serves.
    ///
    /// Returns early without RPC traffic if another task refreshed while this
    /// one waited for the refresh lock.
    pub async fn refresh(
        &self,
        source: &dyn DataFeedSource,
        policy: &RetryPolicy,
    ) -> Result<RefreshSummary, RefreshError> {
        let _guard = self.refresh_lock.lock().await;
        if !self.is_stale() {
            return Ok(RefreshSummary::default());
        }

        let chains = source.chains();
        let fetches = chains.iter().map(|&chain| {
            let newest = self.newest_block(chain);
            let lookback = self.lookback_blocks;
            async move {
                let outcome = execute(
                    || fetch_updates(source, chain, newest, lookback),
                    policy,
                )
                .await;
                (chain, outcome)
            }
        });

        let mut summary = RefreshSummary::default();
        let mut last_error = None;

        for (chain, outcome) in join_all(fetches).await {
            metrics::record_outbound_call("chain_logs", outcome.label());
            match outcome {
                Outcome::Success { data } => {
                    summary.chains_refreshed += 1;
                    summary.updates_added += self.merge(chain, data);
                }
                Outcome::Failure { error } => {
                    tracing::error!(chain_id = %chain, error = %error, "Failed to retrieve beacon update logs");
                    summary.chains_failed += 1;
                    last_error = Some(error);
                }
            }
        }

        match last_error {
            Some(error) if summary.chains_refreshed == 0 => Err(RefreshError::AllChainsFailed(error)),
            _ => {
                self.mark_refreshed();
                tracing::debug!(
                    chains_refreshed = summary.chains_refreshed,
                    chains_failed = summary.chains_failed,
                    updates_added = summary.updates_added,
                    "Transaction log refreshed"
                );
                Ok(summary)
            }
        }
    }
}

/// Logs after `newest`, or over the lookback window when nothing is held yet.
async fn fetch_updates(
    source: &dyn DataFeedSource,
    chain: ChainId,
    newest: Option<u64>,
    lookback: u64,
) -> Result<Vec<BeaconUpdate>, ChainError> {
    let from_block = match newest {
        Some(block) => block + 1,
        None => source.latest_block(chain).await?.saturating_sub(lookback) + 1,
    };
    source.beacon_updates(chain, from_block).await
}

impl std::fmt::Debug for TransactionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionStore")
            .field("chains", &self.logs.len())
            .field("max_age", &self.max_age)
            .field("lookback_blocks", &self.lookback_blocks)
            .finish()
    }
}
