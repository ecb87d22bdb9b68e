// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The closed set of record kinds the store knows how to persist.
//!
//! Each kind implements [`Record`], a small capability interface: identity,
//! an optional payload that must be encrypted at rest, named field access for
//! lookups, and patch merging. The trait is sealed, so the set of kinds is
//! fixed to [`Item`], [`User`] and [`Checkout`].

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::models::{Checkout, Item, User};

mod sealed {
    pub trait Sealed {}

    impl Sealed for crate::models::Item {}
    impl Sealed for crate::models::User {}
    impl Sealed for crate::models::Checkout {}
}

/// Tag identifying a record kind, persisted alongside each bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Item,
    User,
    Checkout,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [RecordKind::Item, RecordKind::User, RecordKind::Checkout];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Item => "item",
            RecordKind::User => "user",
            RecordKind::Checkout => "checkout",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "item" => Some(RecordKind::Item),
            "user" => Some(RecordKind::User),
            "checkout" => Some(RecordKind::Checkout),
            _ => None,
        }
    }

    /// Bucket created for this kind when the store is opened.
    pub fn default_bucket(&self) -> &'static str {
        match self {
            RecordKind::Item => super::ITEMS_BUCKET,
            RecordKind::User => super::USERS_BUCKET,
            RecordKind::Checkout => super::CHECKOUTS_BUCKET,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persistable record.
pub trait Record:
    sealed::Sealed + Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
    const KIND: RecordKind;

    /// Field names accepted by [`Record::field_value`].
    const FIELDS: &'static [&'static str];

    fn id(&self) -> u64;

    /// Payload that is encrypted before the record is written and decrypted
    /// after it is read. `None` for kinds stored entirely in the clear.
    fn sealed_payload_mut(&mut self) -> Option<&mut Vec<u8>> {
        None
    }

    /// Value of a named field for exact-match lookups.
    fn field_value(&self, field: &str) -> Option<Cow<'_, str>>;

    /// Overwrite fields with the non-empty fields of `patch`.
    ///
    /// `id` and `created_at` are never taken from the patch.
    fn merge_from(&mut self, patch: &Self, now: DateTime<Utc>);
}

fn take_if_set(target: &mut String, patch: &str) {
    if !patch.is_empty() {
        *target = patch.to_string();
    }
}

impl Record for Item {
    const KIND: RecordKind = RecordKind::Item;
    const FIELDS: &'static [&'static str] = &["id", "title", "scid"];

    fn id(&self) -> u64 {
        self.id
    }

    fn sealed_payload_mut(&mut self) -> Option<&mut Vec<u8>> {
        Some(&mut self.data)
    }

    fn field_value(&self, field: &str) -> Option<Cow<'_, str>> {
        match field {
            "id" => Some(Cow::Owned(self.id.to_string())),
            "title" => Some(Cow::Borrowed(&self.title)),
            "scid" => Some(Cow::Borrowed(&self.scid)),
            _ => None,
        }
    }

    fn merge_from(&mut self, patch: &Self, now: DateTime<Utc>) {
        take_if_set(&mut self.title, &patch.title);
        take_if_set(&mut self.scid, &patch.scid);
        if !patch.data.is_empty() {
            self.data = patch.data.clone();
        }
        self.updated_at = now;
    }
}

impl Record for User {
    const KIND: RecordKind = RecordKind::User;
    const FIELDS: &'static [&'static str] = &["id", "name", "wallet", "password"];

    fn id(&self) -> u64 {
        self.id
    }

    fn field_value(&self, field: &str) -> Option<Cow<'_, str>> {
        match field {
            "id" => Some(Cow::Owned(self.id.to_string())),
            "name" => Some(Cow::Borrowed(&self.name)),
            "wallet" => Some(Cow::Borrowed(&self.wallet)),
            "password" => Some(Cow::Borrowed(&self.password)),
            _ => None,
        }
    }

    fn merge_from(&mut self, patch: &Self, now: DateTime<Utc>) {
        take_if_set(&mut self.name, &patch.name);
        take_if_set(&mut self.wallet, &patch.wallet);
        take_if_set(&mut self.password, &patch.password);
        self.updated_at = now;
    }
}

impl Record for Checkout {
    const KIND: RecordKind = RecordKind::Checkout;
    const FIELDS: &'static [&'static str] = &["id", "address"];

    fn id(&self) -> u64 {
        self.id
    }

    fn field_value(&self, field: &str) -> Option<Cow<'_, str>> {
        match field {
            "id" => Some(Cow::Owned(self.id.to_string())),
            "address" => Some(Cow::Borrowed(&self.address)),
            _ => None,
        }
    }

    // Checkouts carry no updated_at; expiration stays tied to created_at.
    fn merge_from(&mut self, patch: &Self, _now: DateTime<Utc>) {
        take_if_set(&mut self.address, &patch.address);
    }
}

/// Result of a field lookup.
///
/// Absence is a normal outcome, not an error; hard failures travel in the
/// surrounding `Result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<R> {
    Found(R),
    NotFound,
}

impl<R> Lookup<R> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn found(self) -> Option<R> {
        match self {
            Lookup::Found(record) => Some(record),
            Lookup::NotFound => None,
        }
    }
}
