// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Settlement Reconciler
//!
//! Background task that matches incoming ledger transfers to pending
//! checkouts and reclaims expired ones.
//!
//! ## Strategy
//!
//! Every `interval` (default 5 s) the reconciler:
//! 1. Loads all checkouts from the store.
//! 2. Deletes checkouts whose expiration has passed.
//! 3. Decodes each remaining checkout address into its routing tag
//!    (destination port) and correlation tag (comment). Addresses missing
//!    either tag are inert and skipped.
//! 4. Lists incoming base-asset transfers for the routing tag and looks for
//!    an entry whose port and comment both match.
//! 5. Hands a match to the [`SettlementHandler`], then deletes the checkout
//!    and records the transfer's txid in the same transaction. A txid that
//!    already settled one checkout never settles another.
//!
//! ## Failure Handling
//!
//! Transfer queries are retried with exponential backoff. A checkout whose
//! query or settlement still fails is counted as failed and tried again on
//! the next cycle. Store errors abort the cycle. Neither ends the loop.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown. Backoff
//! sleeps and the interval sleep both wake on cancellation.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use lru::LruCache;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ErrorKind;
use crate::ledger::{CheckoutTags, LedgerError, LedgerWallet, TransferEntry, BASE_ASSET};
use crate::models::Checkout;
use crate::storage::{RecordStore, StoreError, CHECKOUTS_BUCKET};

/// Default interval between reconciliation cycles.
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(5);

/// Decoded addresses kept between cycles.
const TAG_CACHE_CAPACITY: usize = 1024;

// =============================================================================
// Settlement
// =============================================================================

/// Fulfillment hook invoked once per matched checkout.
#[async_trait]
pub trait SettlementHandler: Send + Sync {
    async fn settle(
        &self,
        checkout: &Checkout,
        transfer: &TransferEntry,
    ) -> Result<(), SettlementError>;
}

#[derive(Debug, thiserror::Error)]
#[error("settlement failed: {0}")]
pub struct SettlementError(pub String);

/// Handler that only records the match in the log.
pub struct LogSettlement;

#[async_trait]
impl SettlementHandler for LogSettlement {
    async fn settle(
        &self,
        checkout: &Checkout,
        transfer: &TransferEntry,
    ) -> Result<(), SettlementError> {
        info!(
            checkout_id = checkout.id,
            txid = %transfer.txid,
            amount = transfer.amount,
            height = transfer.height,
            "Checkout settled"
        );
        Ok(())
    }
}

// =============================================================================
// Retry Policy
// =============================================================================

/// Exponential backoff for wallet calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay after the `attempt`-th failure (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `call` until it succeeds, attempts run out, or `shutdown` fires.
    pub async fn run<T, F, Fut>(
        &self,
        op: &'static str,
        shutdown: &CancellationToken,
        mut call: F,
    ) -> Result<T, ReconcileError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= max_attempts => return Err(ReconcileError::Ledger(e)),
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        op,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Wallet call failed, backing off"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {},
                        _ = shutdown.cancelled() => return Err(ReconcileError::Cancelled),
                    }
                    attempt += 1;
                }
            }
        }
    }
}

// =============================================================================
// Reconciler
// =============================================================================

/// Outcome counts of one cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Expired and deleted
    pub expired: usize,
    /// Address lacks a tag or could not be decoded
    pub inert: usize,
    /// Matched, settled and deleted
    pub settled: usize,
    /// Still waiting for payment
    pub pending: usize,
    /// Wallet query or settlement failed; retried next cycle
    pub failed: usize,
}

impl CycleReport {
    fn is_quiet(&self) -> bool {
        self.expired == 0 && self.settled == 0 && self.failed == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("ledger wallet call failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error("reconciliation cancelled")]
    Cancelled,
}

impl ReconcileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconcileError::Store(e) => e.kind(),
            ReconcileError::Ledger(e) => e.kind(),
            ReconcileError::Settlement(_) | ReconcileError::Cancelled => {
                ErrorKind::ExternalCallFailed
            }
        }
    }
}

/// Periodic checkout reconciler that runs as a background tokio task.
///
/// Only one instance should run against a given store.
pub struct Reconciler {
    store: Arc<RecordStore>,
    ledger: Arc<dyn LedgerWallet>,
    handler: Arc<dyn SettlementHandler>,
    interval: Duration,
    retry: RetryPolicy,
    /// Bucket holding the pending checkouts
    bucket: String,
    /// address → decoded tags (`None` = inert)
    tag_cache: Mutex<LruCache<String, Option<CheckoutTags>>>,
}

impl Reconciler {
    pub fn new(
        store: Arc<RecordStore>,
        ledger: Arc<dyn LedgerWallet>,
        handler: Arc<dyn SettlementHandler>,
    ) -> Self {
        Self {
            store,
            ledger,
            handler,
            interval: DEFAULT_RECONCILE_INTERVAL,
            retry: RetryPolicy::default(),
            bucket: CHECKOUTS_BUCKET.to_string(),
            tag_cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(TAG_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[cfg(test)]
    fn with_bucket(mut self, bucket: &str) -> Self {
        self.bucket = bucket.to_string();
        self
    }

    /// Run the reconciler loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(reconciler.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            "Settlement reconciler starting"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            match self.run_cycle(&shutdown).await {
                Ok(report) if report.is_quiet() => {
                    debug!(pending = report.pending, inert = report.inert, "Reconciler cycle idle");
                }
                Ok(report) => {
                    info!(
                        expired = report.expired,
                        settled = report.settled,
                        pending = report.pending,
                        inert = report.inert,
                        failed = report.failed,
                        "Reconciler cycle complete"
                    );
                }
                Err(ReconcileError::Cancelled) => break,
                Err(e) => {
                    warn!(error = %e, "Reconciler cycle failed, will retry");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => break,
            }
        }

        info!("Settlement reconciler shutting down");
    }

    /// Execute one reconciliation cycle over all stored checkouts.
    pub async fn run_cycle(&self, shutdown: &CancellationToken) -> Result<CycleReport, ReconcileError> {
        let checkouts: Vec<Checkout> = self.store.get_all_records(&self.bucket)?;
        let now = Utc::now();
        let mut report = CycleReport::default();

        for checkout in &checkouts {
            if shutdown.is_cancelled() {
                return Err(ReconcileError::Cancelled);
            }

            if checkout.is_expired(now) {
                self.store.delete_record(&self.bucket, checkout.id)?;
                self.forget(&checkout.address);
                debug!(checkout_id = checkout.id, "Expired checkout removed");
                report.expired += 1;
                continue;
            }

            let Some(tags) = self.decode_tags(&checkout.address).await else {
                report.inert += 1;
                continue;
            };

            match self.reconcile_one(checkout, &tags, shutdown).await {
                Ok(true) => report.settled += 1,
                Ok(false) => report.pending += 1,
                Err(ReconcileError::Store(e)) => return Err(ReconcileError::Store(e)),
                Err(ReconcileError::Cancelled) => return Err(ReconcileError::Cancelled),
                Err(e) => {
                    warn!(
                        checkout_id = checkout.id,
                        routing_tag = tags.routing,
                        error = %e,
                        "Checkout reconciliation failed"
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Look for a matching transfer; settle and delete on a hit.
    async fn reconcile_one(
        &self,
        checkout: &Checkout,
        tags: &CheckoutTags,
        shutdown: &CancellationToken,
    ) -> Result<bool, ReconcileError> {
        let transfers = self
            .retry
            .run("GetTransfers", shutdown, || {
                self.ledger.get_incoming_transfers(tags.routing, BASE_ASSET)
            })
            .await?;

        // The wallet returns its whole history; skip transfers that already
        // paid an earlier checkout with the same tags.
        let mut unspent = None;
        for entry in transfers.iter().filter(|entry| entry.matches(tags)) {
            match self.store.settled_by(&entry.txid)? {
                Some(settled) => debug!(
                    checkout_id = checkout.id,
                    txid = %entry.txid,
                    settled_checkout_id = settled,
                    "Transfer already consumed"
                ),
                None => {
                    unspent = Some(entry);
                    break;
                }
            }
        }
        let Some(transfer) = unspent else {
            return Ok(false);
        };

        self.handler.settle(checkout, transfer).await?;
        self.store
            .record_settlement(&self.bucket, checkout.id, &transfer.txid)?;
        self.forget(&checkout.address);

        info!(
            checkout_id = checkout.id,
            routing_tag = tags.routing,
            correlation_tag = %tags.correlation,
            txid = %transfer.txid,
            "Checkout matched incoming transfer"
        );
        Ok(true)
    }

    /// Tags carried by `address`, or `None` if the checkout is inert.
    ///
    /// Successful decodes are cached; wallet failures are not, so the
    /// address is decoded again next cycle.
    async fn decode_tags(&self, address: &str) -> Option<CheckoutTags> {
        if let Some(cached) = self.cache_get(address) {
            return cached;
        }

        match self.ledger.split_integrated_address(address).await {
            Ok(decoded) => {
                let tags = decoded.tags();
                if tags.is_none() {
                    debug!(address, "Checkout address lacks routing or correlation tag");
                }
                if let Ok(mut cache) = self.tag_cache.lock() {
                    cache.put(address.to_string(), tags.clone());
                }
                tags
            }
            Err(e) => {
                warn!(address, error = %e, "Failed to decode checkout address");
                None
            }
        }
    }

    fn cache_get(&self, address: &str) -> Option<Option<CheckoutTags>> {
        let mut cache = self.tag_cache.lock().ok()?;
        cache.get(address).cloned()
    }

    fn forget(&self, address: &str) {
        if let Ok(mut cache) = self.tag_cache.lock() {
            cache.pop(address);
        }
    }
}
