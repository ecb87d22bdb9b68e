// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Record Storage Module
//!
//! Persistent storage for items, users and checkouts in a single embedded
//! redb file.
//!
//! ## Storage Layout
//!
//! ```text
//! records.redb
//!   items       {id} -> Item JSON     (data field encrypted)
//!   users       {id} -> User JSON
//!   checkouts   {id} -> Checkout JSON
//!   __buckets   {bucket} -> record kind
//!   __sequences {bucket} -> last ID
//!   __settlements {txid} -> checkout ID it settled
//! ```
//!
//! ## Security Model
//!
//! - Only the item `data` payload is encrypted, with the process secret
//! - Encryption is unauthenticated; a wrong secret reads back as garbage
//! - Everything else, including user passwords, is stored as plain JSON

pub mod record;
pub mod record_store;
pub mod repository;

pub use record::{Lookup, Record, RecordKind};
pub use record_store::{RecordStore, StoreError, StoreResult};
pub use repository::{ItemRepository, UserRepository};

/// Bucket holding [`crate::models::Item`] records.
pub const ITEMS_BUCKET: &str = "items";

/// Bucket holding [`crate::models::User`] records.
pub const USERS_BUCKET: &str = "users";

/// Bucket holding [`crate::models::Checkout`] records.
pub const CHECKOUTS_BUCKET: &str = "checkouts";
