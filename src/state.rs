// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::checkout::CheckoutGenerator;
use crate::ledger::LedgerWallet;
use crate::storage::{ItemRepository, RecordStore, UserRepository};

/// Shared handles created once at startup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RecordStore>,
    pub ledger: Arc<dyn LedgerWallet>,
    pub checkouts: Arc<CheckoutGenerator>,
}

impl AppState {
    pub fn new(store: Arc<RecordStore>, ledger: Arc<dyn LedgerWallet>) -> Self {
        let checkouts = Arc::new(CheckoutGenerator::new(store.clone(), ledger.clone()));
        Self {
            store,
            ledger,
            checkouts,
        }
    }

    pub fn items(&self) -> ItemRepository<'_> {
        ItemRepository::new(&self.store)
    }

    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.store)
    }
}
