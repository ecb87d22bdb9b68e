// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded record store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `<bucket>`: decimal-string ID → JSON document, one table per bucket
//! - `__buckets`: bucket name → record kind bound to it
//! - `__sequences`: bucket name → last allocated ID
//! - `__settlements`: transfer txid → ID of the checkout it settled
//! - `__health`: scratch table for the health probe
//!
//! Keys are compared byte-wise, so full scans return records in ascending
//! order of their decimal string (`"10"` sorts before `"2"`).
//!
//! Item payloads are encrypted with the store secret before they are written
//! and decrypted after they are read. Every other field is stored as plain
//! JSON.
//!
//! Each public operation runs in its own redb transaction. redb serializes
//! writers; readers see the last committed state. Nothing spans calls.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
};
use tracing::{debug, info};

use super::record::{Lookup, Record, RecordKind};
use crate::crypto::{self, CryptoError};
use crate::error::ErrorKind;

// =============================================================================
// Table Definitions
// =============================================================================

/// Bucket registry: bucket name → record kind name.
const BUCKETS: TableDefinition<&str, &str> = TableDefinition::new("__buckets");

/// Per-bucket ID sequences: bucket name → last allocated ID.
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("__sequences");

/// Consumed transfers: txid → ID of the checkout it settled.
const SETTLEMENTS: TableDefinition<&str, u64> = TableDefinition::new("__settlements");

/// Scratch space for [`RecordStore::health_check`].
const HEALTH: TableDefinition<&str, &[u8]> = TableDefinition::new("__health");

const RESERVED_PREFIX: &str = "__";

fn records_table(bucket: &str) -> TableDefinition<'_, &'static str, &'static [u8]> {
    TableDefinition::new(bucket)
}

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("payload encryption error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("not found: {bucket}/{id}")]
    NotFound { bucket: String, id: u64 },

    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    #[error("bucket {bucket} holds {expected} records, got {found}")]
    UnsupportedType {
        bucket: String,
        expected: RecordKind,
        found: RecordKind,
    },

    #[error("{kind} records have no field {field:?}")]
    UnknownField { kind: RecordKind, field: String },

    #[error("{field} already taken: {value}")]
    DuplicateField { field: &'static str, value: String },

    #[error("record ID must be positive")]
    InvalidId,

    #[error("invalid bucket name: {0:?}")]
    InvalidBucket(String),

    #[error("bucket {bucket} is bound to unknown record kind {kind:?}")]
    CorruptBucket { bucket: String, kind: String },

    #[error("health check failed: {0}")]
    HealthCheck(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound { .. } | StoreError::BucketNotFound(_) => ErrorKind::NotFound,
            StoreError::UnsupportedType { .. } | StoreError::UnknownField { .. } => {
                ErrorKind::UnsupportedType
            }
            StoreError::DuplicateField { .. } => ErrorKind::DuplicateField,
            StoreError::Crypto(e) => e.kind(),
            StoreError::InvalidId | StoreError::InvalidBucket(_) => ErrorKind::Invalid,
            _ => ErrorKind::ExternalCallFailed,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Bucket Registry Helpers
// =============================================================================

fn validate_bucket_name(bucket: &str) -> StoreResult<()> {
    if bucket.is_empty() || bucket.starts_with(RESERVED_PREFIX) {
        return Err(StoreError::InvalidBucket(bucket.to_string()));
    }
    Ok(())
}

/// Kind bound to `bucket`, or `BucketNotFound`.
fn bucket_kind<T>(registry: &T, bucket: &str) -> StoreResult<RecordKind>
where
    T: ReadableTable<&'static str, &'static str>,
{
    let guard = registry
        .get(bucket)?
        .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))?;
    let name = guard.value();
    RecordKind::parse(name).ok_or_else(|| StoreError::CorruptBucket {
        bucket: bucket.to_string(),
        kind: name.to_string(),
    })
}

/// Ensure `bucket` exists and holds records of `kind`.
fn expect_kind<T>(registry: &T, bucket: &str, kind: RecordKind) -> StoreResult<()>
where
    T: ReadableTable<&'static str, &'static str>,
{
    let bound = bucket_kind(registry, bucket)?;
    if bound != kind {
        return Err(StoreError::UnsupportedType {
            bucket: bucket.to_string(),
            expected: bound,
            found: kind,
        });
    }
    Ok(())
}

// =============================================================================
// RecordStore
// =============================================================================

/// Process-wide handle to the record database.
///
/// Open once at startup, share behind an `Arc`, drop at shutdown.
pub struct RecordStore {
    db: Database,
    secret: String,
    path: PathBuf,
}

impl RecordStore {
    /// Open (or create) the database at `path` and make sure the default
    /// buckets exist.
    ///
    /// `secret` is the password used to encrypt item payloads.
    pub fn open(path: impl AsRef<Path>, secret: impl Into<String>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(path)?;

        // Pre-create internal tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(BUCKETS)?;
            let _ = write_txn.open_table(SEQUENCES)?;
            let _ = write_txn.open_table(SETTLEMENTS)?;
            let _ = write_txn.open_table(HEALTH)?;
        }
        write_txn.commit()?;

        let store = Self {
            db,
            secret: secret.into(),
            path: path.to_path_buf(),
        };

        for kind in RecordKind::ALL {
            store.ensure_bucket(kind.default_bucket(), kind)?;
        }

        info!(path = %store.path.display(), "Record store opened");
        Ok(store)
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create `bucket` bound to `kind` if it does not exist yet.
    ///
    /// Re-binding an existing bucket to another kind fails with
    /// `UnsupportedType`.
    pub fn ensure_bucket(&self, bucket: &str, kind: RecordKind) -> StoreResult<()> {
        validate_bucket_name(bucket)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut registry = write_txn.open_table(BUCKETS)?;
            let bound = match bucket_kind(&registry, bucket) {
                Ok(bound) => Some(bound),
                Err(StoreError::BucketNotFound(_)) => None,
                Err(e) => return Err(e),
            };

            match bound {
                Some(bound) if bound != kind => {
                    return Err(StoreError::UnsupportedType {
                        bucket: bucket.to_string(),
                        expected: bound,
                        found: kind,
                    });
                }
                Some(_) => {}
                None => {
                    registry.insert(bucket, kind.as_str())?;
                    debug!(bucket, kind = %kind, "Created bucket");
                }
            }

            let _ = write_txn.open_table(records_table(bucket))?;
        }
        write_txn.commit()?;
        Ok(())
    }

    // =========================================================================
    // Sequencing
    // =========================================================================

    /// Allocate the next ID for `bucket`.
    ///
    /// IDs start at 1 and strictly increase; concurrent callers are
    /// serialized by the single redb writer.
    pub fn next_id(&self, bucket: &str) -> StoreResult<u64> {
        let write_txn = self.db.begin_write()?;
        let id = {
            let registry = write_txn.open_table(BUCKETS)?;
            bucket_kind(&registry, bucket)?;

            let mut sequences = write_txn.open_table(SEQUENCES)?;
            let current = sequences.get(bucket)?.map(|v| v.value()).unwrap_or(0);
            let next = current + 1;
            sequences.insert(bucket, next)?;
            next
        };
        write_txn.commit()?;
        Ok(id)
    }

    // =========================================================================
    // Record CRUD
    // =========================================================================

    /// Insert or overwrite `record` under its ID.
    ///
    /// The caller's value is left untouched; encryption happens on a copy.
    pub fn create_record<R: Record>(&self, bucket: &str, record: &R) -> StoreResult<()> {
        if record.id() == 0 {
            return Err(StoreError::InvalidId);
        }

        let key = record.id().to_string();
        let bytes = self.encode(record)?;

        let write_txn = self.db.begin_write()?;
        {
            let registry = write_txn.open_table(BUCKETS)?;
            expect_kind(&registry, bucket, R::KIND)?;

            let mut table = write_txn.open_table(records_table(bucket))?;
            table.insert(key.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;

        debug!(bucket, id = record.id(), kind = %R::KIND, "Stored record");
        Ok(())
    }

    /// Look up a single record by ID.
    pub fn get_record_by_id<R: Record>(&self, bucket: &str, id: u64) -> StoreResult<R> {
        let read_txn = self.db.begin_read()?;
        let registry = read_txn.open_table(BUCKETS)?;
        expect_kind(&registry, bucket, R::KIND)?;

        let table = read_txn.open_table(records_table(bucket))?;
        let key = id.to_string();
        let value = table
            .get(key.as_str())?
            .ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                id,
            })?;
        self.decode(value.value())
    }

    /// Every record in `bucket`, in key order.
    pub fn get_all_records<R: Record>(&self, bucket: &str) -> StoreResult<Vec<R>> {
        let read_txn = self.db.begin_read()?;
        let registry = read_txn.open_table(BUCKETS)?;
        expect_kind(&registry, bucket, R::KIND)?;

        let table = read_txn.open_table(records_table(bucket))?;
        let mut records = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            records.push(self.decode(entry.1.value())?);
        }
        Ok(records)
    }

    /// First record whose `field` equals `value` exactly (case-sensitive).
    ///
    /// Linear scan. Only the matching record has its payload decrypted.
    pub fn get_by_field<R: Record>(
        &self,
        bucket: &str,
        field: &str,
        value: &str,
    ) -> StoreResult<Lookup<R>> {
        if !R::FIELDS.contains(&field) {
            return Err(StoreError::UnknownField {
                kind: R::KIND,
                field: field.to_string(),
            });
        }

        let read_txn = self.db.begin_read()?;
        let registry = read_txn.open_table(BUCKETS)?;
        expect_kind(&registry, bucket, R::KIND)?;

        let table = read_txn.open_table(records_table(bucket))?;
        for entry in table.iter()? {
            let entry = entry?;
            let record: R = serde_json::from_slice(entry.1.value())?;
            if record.field_value(field).as_deref() == Some(value) {
                return Ok(Lookup::Found(self.open_payload(record)?));
            }
        }
        Ok(Lookup::NotFound)
    }

    /// Remove the record at `id`.
    ///
    /// Removing an absent key is not an error; use [`RecordStore::exists`]
    /// first when absence matters.
    pub fn delete_record(&self, bucket: &str, id: u64) -> StoreResult<()> {
        let key = id.to_string();

        let write_txn = self.db.begin_write()?;
        let removed = {
            let registry = write_txn.open_table(BUCKETS)?;
            bucket_kind(&registry, bucket)?;

            let mut table = write_txn.open_table(records_table(bucket))?;
            let removed = table.remove(key.as_str())?.is_some();
            removed
        };
        write_txn.commit()?;

        debug!(bucket, id, removed, "Deleted record");
        Ok(())
    }

    /// Merge the non-empty fields of `patch` into the record at `id`.
    ///
    /// Read, merge and write happen in one write transaction. Returns the
    /// merged record with its payload in plaintext.
    pub fn update_record<R: Record>(&self, bucket: &str, id: u64, patch: &R) -> StoreResult<R> {
        let key = id.to_string();

        let write_txn = self.db.begin_write()?;
        let updated = {
            let registry = write_txn.open_table(BUCKETS)?;
            expect_kind(&registry, bucket, R::KIND)?;

            let mut table = write_txn.open_table(records_table(bucket))?;

            // Read existing value and deserialize before mutating
            let existing_bytes = {
                let existing = table
                    .get(key.as_str())?
                    .ok_or_else(|| StoreError::NotFound {
                        bucket: bucket.to_string(),
                        id,
                    })?;
                existing.value().to_vec()
            };

            let mut record: R = self.decode(&existing_bytes)?;
            record.merge_from(patch, Utc::now());

            let bytes = self.encode(&record)?;
            table.insert(key.as_str(), bytes.as_slice())?;
            record
        };
        write_txn.commit()?;

        debug!(bucket, id, kind = %R::KIND, "Updated record");
        Ok(updated)
    }

    // =========================================================================
    // Settlements
    // =========================================================================

    /// Checkout ID that transfer `txid` already settled, if any.
    pub fn settled_by(&self, txid: &str) -> StoreResult<Option<u64>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SETTLEMENTS)?;
        let id = table.get(txid)?.map(|v| v.value());
        Ok(id)
    }

    /// Delete the record at `id` and mark `txid` as consumed by it, in one
    /// write transaction.
    ///
    /// Fails with `DuplicateField` if `txid` was already consumed; nothing is
    /// deleted in that case.
    pub fn record_settlement(&self, bucket: &str, id: u64, txid: &str) -> StoreResult<()> {
        let key = id.to_string();

        let write_txn = self.db.begin_write()?;
        {
            let registry = write_txn.open_table(BUCKETS)?;
            bucket_kind(&registry, bucket)?;

            let mut settlements = write_txn.open_table(SETTLEMENTS)?;
            if settlements.get(txid)?.is_some() {
                return Err(StoreError::DuplicateField {
                    field: "txid",
                    value: txid.to_string(),
                });
            }
            settlements.insert(txid, id)?;

            let mut table = write_txn.open_table(records_table(bucket))?;
            table.remove(key.as_str())?;
        }
        write_txn.commit()?;

        debug!(bucket, id, txid, "Recorded settlement");
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Whether a record exists at `id`.
    pub fn exists(&self, bucket: &str, id: u64) -> StoreResult<bool> {
        let read_txn = self.db.begin_read()?;
        let registry = read_txn.open_table(BUCKETS)?;
        bucket_kind(&registry, bucket)?;

        let table = read_txn.open_table(records_table(bucket))?;
        let key = id.to_string();
        let found = table.get(key.as_str())?.is_some();
        Ok(found)
    }

    /// Number of records in `bucket`.
    pub fn count(&self, bucket: &str) -> StoreResult<u64> {
        let read_txn = self.db.begin_read()?;
        let registry = read_txn.open_table(BUCKETS)?;
        bucket_kind(&registry, bucket)?;

        let table = read_txn.open_table(records_table(bucket))?;
        Ok(table.len()?)
    }

    /// Write-read-delete probe to verify the database file is usable.
    pub fn health_check(&self) -> StoreResult<()> {
        let probe = b"health_check_data";

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(HEALTH)?;
            table.insert("probe", probe.as_slice())?;
        }
        write_txn.commit()?;

        let read_back = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(HEALTH)?;
            let value = table.get("probe")?.map(|v| v.value().to_vec());
            value
        };

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(HEALTH)?;
            table.remove("probe")?;
        }
        write_txn.commit()?;

        if read_back.as_deref() != Some(probe.as_slice()) {
            return Err(StoreError::HealthCheck(
                "probe data mismatch".to_string(),
            ));
        }
        Ok(())
    }

    fn encode<R: Record>(&self, record: &R) -> StoreResult<Vec<u8>> {
        let mut sealed = record.clone();
        if let Some(payload) = sealed.sealed_payload_mut() {
            *payload = crypto::encrypt(payload, &self.secret)?;
        }
        Ok(serde_json::to_vec(&sealed)?)
    }

    fn decode<R: Record>(&self, bytes: &[u8]) -> StoreResult<R> {
        let record: R = serde_json::from_slice(bytes)?;
        self.open_payload(record)
    }

    fn open_payload<R: Record>(&self, mut record: R) -> StoreResult<R> {
        if let Some(payload) = record.sealed_payload_mut() {
            *payload = crypto::decrypt(payload, &self.secret)?;
        }
        Ok(record)
    }
}

// =============================================================================
// Tests
// =============================================================================
