// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository.
//!
//! Names and wallet addresses are both unique. The password is whatever the
//! caller derived from the ledger transaction and is stored unmodified.

use super::super::{Lookup, RecordStore, StoreError, StoreResult, USERS_BUCKET};
use crate::models::User;

/// Repository for user operations on the record store.
pub struct UserRepository<'a> {
    store: &'a RecordStore,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository.
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Register a user with a fresh ID.
    ///
    /// Fails with `DuplicateField` if the name or wallet is taken.
    pub fn create(&self, name: &str, wallet: &str, password: &str) -> StoreResult<User> {
        self.ensure_unique(None, name, wallet)?;

        let id = self.store.next_id(USERS_BUCKET)?;
        let user = User::new(id, name, wallet, password);
        self.store.create_record(USERS_BUCKET, &user)?;
        Ok(user)
    }

    pub fn get(&self, id: u64) -> StoreResult<User> {
        self.store.get_record_by_id(USERS_BUCKET, id)
    }

    pub fn find_by_name(&self, name: &str) -> StoreResult<Lookup<User>> {
        self.store.get_by_field(USERS_BUCKET, "name", name)
    }

    pub fn find_by_wallet(&self, wallet: &str) -> StoreResult<Lookup<User>> {
        self.store.get_by_field(USERS_BUCKET, "wallet", wallet)
    }

    pub fn list(&self) -> StoreResult<Vec<User>> {
        self.store.get_all_records(USERS_BUCKET)
    }

    /// Apply a patch; blank fields on `patch` are left as stored.
    ///
    /// A name or wallet change is checked against other users first.
    pub fn update(&self, id: u64, patch: &User) -> StoreResult<User> {
        self.ensure_unique(Some(id), &patch.name, &patch.wallet)?;
        self.store.update_record(USERS_BUCKET, id, patch)
    }

    /// Delete a user. Fails with `NotFound` if there is none at `id`.
    pub fn delete(&self, id: u64) -> StoreResult<()> {
        if !self.store.exists(USERS_BUCKET, id)? {
            return Err(StoreError::NotFound {
                bucket: USERS_BUCKET.to_string(),
                id,
            });
        }
        self.store.delete_record(USERS_BUCKET, id)
    }

    /// Reject a name or wallet already held by a user other than `owner`.
    /// Empty values are not checked.
    fn ensure_unique(&self, owner: Option<u64>, name: &str, wallet: &str) -> StoreResult<()> {
        let taken =
            |found: Lookup<User>| matches!(found, Lookup::Found(other) if Some(other.id) != owner);

        if !name.is_empty() && taken(self.find_by_name(name)?) {
            return Err(StoreError::DuplicateField {
                field: "name",
                value: name.to_string(),
            });
        }
        if !wallet.is_empty() && taken(self.find_by_wallet(wallet)?) {
            return Err(StoreError::DuplicateField {
                field: "wallet",
                value: wallet.to_string(),
            });
        }
        Ok(())
    }
}
