// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Crate-wide error taxonomy.
//!
//! Each module keeps its own `thiserror` enum. [`Error`] wraps all of them
//! for callers that cross module boundaries (mainly `main`), and
//! [`ErrorKind`] is the coarse classification every module error maps to.

use std::fmt;

use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::crypto::CryptoError;
use crate::ledger::LedgerError;
use crate::reconciler::ReconcileError;
use crate::storage::StoreError;

/// Coarse error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Requested record or bucket does not exist
    NotFound,
    /// Record type does not match the bucket it was addressed to
    UnsupportedType,
    /// Ciphertext shorter than one IV
    InputTooShort,
    /// Uniqueness constraint violated
    DuplicateField,
    /// Wallet RPC, settlement hook or other external dependency failed
    ExternalCallFailed,
    /// Bad configuration, argument or stored data
    Invalid,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::UnsupportedType => "unsupported_type",
            ErrorKind::InputTooShort => "input_too_short",
            ErrorKind::DuplicateField => "duplicate_field",
            ErrorKind::ExternalCallFailed => "external_call_failed",
            ErrorKind::Invalid => "invalid",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(e) => e.kind(),
            Error::Crypto(e) => e.kind(),
            Error::Store(e) => e.kind(),
            Error::Ledger(e) => e.kind(),
            Error::Checkout(e) => e.kind(),
            Error::Reconcile(e) => e.kind(),
        }
    }
}
