// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger wallet integration.
//!
//! This module provides functionality for:
//! - Building integrated addresses that carry a routing tag (destination
//!   port) and a correlation tag (comment)
//! - Decoding integrated addresses back into their tags
//! - Listing incoming transfers filtered by destination port

pub mod client;
#[cfg(test)]
pub(crate) mod fake;
pub mod types;

use async_trait::async_trait;

use crate::error::ErrorKind;

pub use client::WalletRpcClient;
pub use types::*;

/// Operations the service needs from a ledger wallet.
#[async_trait]
pub trait LedgerWallet: Send + Sync {
    /// The wallet's own base address.
    async fn get_address(&self) -> Result<String, LedgerError>;

    /// Build an address paying `base` that embeds both tags.
    async fn make_integrated_address(
        &self,
        base: &str,
        routing_tag: u64,
        correlation_tag: &str,
    ) -> Result<String, LedgerError>;

    /// Decode an integrated address into its base address and arguments.
    async fn split_integrated_address(
        &self,
        address: &str,
    ) -> Result<IntegratedAddress, LedgerError>;

    /// Incoming transfers of `asset` sent to destination port `routing_tag`.
    async fn get_incoming_transfers(
        &self,
        routing_tag: u64,
        asset: &str,
    ) -> Result<Vec<TransferEntry>, LedgerError>;
}

/// Errors that can occur talking to the wallet.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidRpcUrl(_) => ErrorKind::Invalid,
            _ => ErrorKind::ExternalCallFailed,
        }
    }
}
