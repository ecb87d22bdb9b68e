// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Item repository.
//!
//! Items live in the `items` bucket; titles are unique. The uniqueness check
//! is a lookup before the write, not a constraint, so two concurrent
//! creations with the same title can both succeed.

use super::super::{Lookup, RecordStore, StoreError, StoreResult, ITEMS_BUCKET};
use crate::models::{Item, ItemDetails};

/// Repository for item operations on the record store.
pub struct ItemRepository<'a> {
    store: &'a RecordStore,
}

impl<'a> ItemRepository<'a> {
    /// Create a new ItemRepository.
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Create an item with a fresh ID.
    ///
    /// Fails with `DuplicateField` if the title is taken.
    pub fn create(&self, title: &str, scid: &str, details: &ItemDetails) -> StoreResult<Item> {
        if self.find_by_title(title)?.is_found() {
            return Err(StoreError::DuplicateField {
                field: "title",
                value: title.to_string(),
            });
        }

        let id = self.store.next_id(ITEMS_BUCKET)?;
        let item = Item::new(id, title, scid, details)?;
        self.store.create_record(ITEMS_BUCKET, &item)?;
        Ok(item)
    }

    /// Get an item by ID.
    pub fn get(&self, id: u64) -> StoreResult<Item> {
        self.store.get_record_by_id(ITEMS_BUCKET, id)
    }

    pub fn find_by_title(&self, title: &str) -> StoreResult<Lookup<Item>> {
        self.store.get_by_field(ITEMS_BUCKET, "title", title)
    }

    /// List all items.
    pub fn list(&self) -> StoreResult<Vec<Item>> {
        self.store.get_all_records(ITEMS_BUCKET)
    }

    /// Apply a patch; blank fields on `patch` are left as stored.
    ///
    /// A title change is checked against other items first.
    pub fn update(&self, id: u64, patch: &Item) -> StoreResult<Item> {
        if !patch.title.is_empty() {
            if let Lookup::Found(other) = self.find_by_title(&patch.title)? {
                if other.id != id {
                    return Err(StoreError::DuplicateField {
                        field: "title",
                        value: patch.title.clone(),
                    });
                }
            }
        }
        self.store.update_record(ITEMS_BUCKET, id, patch)
    }

    /// Delete an item.
    pub fn delete(&self, id: u64) -> StoreResult<()> {
        if !self.store.exists(ITEMS_BUCKET, id)? {
            return Err(StoreError::NotFound {
                bucket: ITEMS_BUCKET.to_string(),
                id,
            });
        }
        self.store.delete_record(ITEMS_BUCKET, id)
    }
}
