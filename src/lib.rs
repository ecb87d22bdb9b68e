// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger Store - Encrypted Record Store & Checkout Settlement Service
//!
//! This crate persists items, users and pending checkouts in an embedded
//! redb database, with item payloads encrypted at rest. A background
//! reconciler settles checkouts against incoming transfers reported by a
//! ledger wallet.
//!
//! ## Modules
//!
//! - `crypto` - AES-256-CFB payload encryption
//! - `storage` - Record store and typed repositories (redb)
//! - `ledger` - Ledger wallet JSON-RPC client
//! - `checkout` - Checkout creation
//! - `reconciler` - Settlement and expiry background task

pub mod checkout;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod models;
pub mod reconciler;
pub mod state;
pub mod storage;
