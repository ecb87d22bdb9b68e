// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted record types: items, users and pending checkouts.
//!
//! All three are stored as JSON documents keyed by their decimal ID. The
//! store only ever hands out transient copies; nothing here is shared.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long a checkout stays payable after creation.
pub const CHECKOUT_TTL: Duration = Duration::minutes(5);

/// Descriptive fields of an item, stored together as one encrypted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetails {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub file: String,
}

/// A listed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    /// Unique within the items bucket
    pub title: String,
    /// Ledger smart contract identifier
    #[serde(default)]
    pub scid: String,
    /// Marshaled [`ItemDetails`]. Ciphertext at rest, plaintext in memory.
    #[serde(default, with = "base64_bytes")]
    pub data: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn new(
        id: u64,
        title: impl Into<String>,
        scid: impl Into<String>,
        details: &ItemDetails,
    ) -> serde_json::Result<Self> {
        let now = Utc::now();
        Ok(Self {
            id,
            title: title.into(),
            scid: scid.into(),
            data: serde_json::to_vec(details)?,
            created_at: now,
            updated_at: now,
        })
    }

    /// Decode the details sub-document.
    ///
    /// Fails if `data` is not valid JSON, which is also what a payload
    /// decrypted with the wrong secret looks like.
    pub fn details(&self) -> serde_json::Result<ItemDetails> {
        serde_json::from_slice(&self.data)
    }

    /// Build a patch that only replaces the details document.
    pub fn details_patch(details: &ItemDetails) -> serde_json::Result<Self> {
        let mut patch = Self::empty();
        patch.data = serde_json::to_vec(details)?;
        Ok(patch)
    }

    /// A record with every field blank, for use as an update patch.
    pub fn empty() -> Self {
        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        Self {
            id: 0,
            title: String::new(),
            scid: String::new(),
            data: Vec::new(),
            created_at: epoch,
            updated_at: epoch,
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    /// Unique
    pub name: String,
    /// Ledger wallet address, unique
    pub wallet: String,
    /// Derived from a ledger transaction; stored as-is
    #[serde(default)]
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        id: u64,
        name: impl Into<String>,
        wallet: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            wallet: wallet.into(),
            password: password.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// A record with every field blank, for use as an update patch.
    pub fn empty() -> Self {
        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        Self {
            id: 0,
            name: String::new(),
            wallet: String::new(),
            password: String::new(),
            created_at: epoch,
            updated_at: epoch,
        }
    }
}

/// A time-boxed pending payment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    pub id: u64,
    /// Integrated address carrying the routing and correlation tags
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub expiration: DateTime<Utc>,
}

impl Checkout {
    pub fn new(id: u64, address: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            address: address.into(),
            created_at,
            expiration: created_at + CHECKOUT_TTL,
        }
    }

    /// Strictly past the expiration instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expiration
    }
}

/// Serde adapter encoding byte payloads as standard base64 strings.
mod base64_bytes {
    use base64ct::{Base64, Encoding};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&Base64::encode_string(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Base64::decode_vec(&encoded).map_err(D::Error::custom)
    }
}
