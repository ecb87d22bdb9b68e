// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Checkout Generator
//!
//! Creates pending payment requests. Each checkout is an integrated address
//! pointing at the service wallet that carries:
//!
//! - a routing tag (destination port) shared by all checkouts of one flow
//! - a correlation tag (comment) that identifies this particular request
//!
//! The checkout is persisted with a five minute expiry. Settlement and
//! expiry are handled by [`crate::reconciler::Reconciler`].

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::error::ErrorKind;
use crate::ledger::{LedgerError, LedgerWallet};
use crate::models::Checkout;
use crate::storage::{RecordStore, StoreError, CHECKOUTS_BUCKET};

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("ledger wallet call failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl CheckoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::Ledger(e) => e.kind(),
            CheckoutError::Store(e) => e.kind(),
        }
    }
}

/// Builds and persists checkouts.
pub struct CheckoutGenerator {
    store: Arc<RecordStore>,
    ledger: Arc<dyn LedgerWallet>,
}

impl CheckoutGenerator {
    pub fn new(store: Arc<RecordStore>, ledger: Arc<dyn LedgerWallet>) -> Self {
        Self { store, ledger }
    }

    /// Request an integrated address for the two tags and store it as a
    /// pending checkout.
    ///
    /// Wallet errors are returned as-is; nothing is retried and nothing is
    /// persisted when the wallet call fails.
    pub async fn create_checkout(
        &self,
        routing_tag: u64,
        correlation_tag: &str,
    ) -> Result<Checkout, CheckoutError> {
        let base = self.ledger.get_address().await?;
        let address = self
            .ledger
            .make_integrated_address(&base, routing_tag, correlation_tag)
            .await?;

        let id = self.store.next_id(CHECKOUTS_BUCKET)?;
        let checkout = Checkout::new(id, address, Utc::now());
        self.store.create_record(CHECKOUTS_BUCKET, &checkout)?;

        info!(
            checkout_id = checkout.id,
            routing_tag,
            correlation_tag,
            expiration = %checkout.expiration,
            "Checkout created"
        );
        Ok(checkout)
    }

    /// All checkouts currently stored, expired or not.
    pub fn list(&self) -> Result<Vec<Checkout>, StoreError> {
        self.store.get_all_records(CHECKOUTS_BUCKET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::fake::FakeLedger;
    use crate::models::CHECKOUT_TTL;

    fn setup() -> (CheckoutGenerator, Arc<FakeLedger>, Arc<RecordStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordStore::open(dir.path().join("co.redb"), "s").unwrap());
        let ledger = Arc::new(FakeLedger::new());
        let generator = CheckoutGenerator::new(store.clone(), ledger.clone());
        (generator, ledger, store, dir)
    }

    #[tokio::test]
    async fn create_checkout_persists_tagged_address() {
        let (generator, ledger, store, _dir) = setup();

        let checkout = generator.create_checkout(7777, "order-42").await.unwrap();
        assert_eq!(checkout.id, 1);
        assert_eq!(checkout.expiration - checkout.created_at, CHECKOUT_TTL);

        let stored: Checkout = store.get_record_by_id(CHECKOUTS_BUCKET, 1).unwrap();
        assert_eq!(stored, checkout);

        let split = ledger
            .split_integrated_address(&checkout.address)
            .await
            .unwrap();
        let tags = split.tags().unwrap();
        assert_eq!(tags.routing, 7777);
        assert_eq!(tags.correlation, "order-42");

        let second = generator.create_checkout(7777, "order-43").await.unwrap();
        assert_eq!(second.id, 2);
        assert_ne!(second.address, checkout.address);
        assert_eq!(generator.list().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn wallet_failure_persists_nothing() {
        let (generator, ledger, store, _dir) = setup();
        ledger.fail_next_address(1);

        let err = generator.create_checkout(7777, "order-42").await.unwrap_err();
        assert!(matches!(err, CheckoutError::Ledger(LedgerError::Transport(_))));
        assert_eq!(err.kind(), ErrorKind::ExternalCallFailed);
        assert_eq!(store.count(CHECKOUTS_BUCKET).unwrap(), 0);

        // No ID was consumed either
        let checkout = generator.create_checkout(7777, "order-42").await.unwrap();
        assert_eq!(checkout.id, 1);
    }
}
