// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory wallet used by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Arguments, IntegratedAddress, LedgerError, LedgerWallet, TransferEntry};

pub(crate) const FAKE_BASE_ADDRESS: &str = "dero1qfakebase";

#[derive(Default)]
pub(crate) struct FakeLedger {
    addresses: Mutex<HashMap<String, Arguments>>,
    transfers: Mutex<Vec<(String, TransferEntry)>>,
    fail_transfers: AtomicU32,
    fail_address: AtomicU32,
    transfer_calls: AtomicUsize,
    split_calls: AtomicUsize,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an integrated address with arbitrary arguments.
    pub fn register_address(&self, address: &str, arguments: Arguments) {
        self.addresses
            .lock()
            .unwrap()
            .insert(address.to_string(), arguments);
    }

    /// Add an incoming transfer of the base asset.
    pub fn push_transfer(&self, destination_port: u64, comment: &str) {
        self.push_asset_transfer(super::BASE_ASSET, destination_port, comment);
    }

    pub fn push_asset_transfer(&self, asset: &str, destination_port: u64, comment: &str) {
        let mut transfers = self.transfers.lock().unwrap();
        let entry = TransferEntry {
            txid: format!("tx-{}", transfers.len() + 1),
            incoming: true,
            amount: 1,
            destination_port,
            payload: Arguments(vec![super::Argument::string(super::COMMENT_ARG, comment)]),
            ..Default::default()
        };
        transfers.push((asset.to_string(), entry));
    }

    /// Make the next `n` transfer queries fail.
    pub fn fail_next_transfers(&self, n: u32) {
        self.fail_transfers.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` address requests fail.
    pub fn fail_next_address(&self, n: u32) {
        self.fail_address.store(n, Ordering::SeqCst);
    }

    pub fn transfer_calls(&self) -> usize {
        self.transfer_calls.load(Ordering::SeqCst)
    }

    pub fn split_calls(&self) -> usize {
        self.split_calls.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl LedgerWallet for FakeLedger {
    async fn get_address(&self) -> Result<String, LedgerError> {
        if Self::take_failure(&self.fail_address) {
            return Err(LedgerError::Transport("wallet offline".to_string()));
        }
        Ok(FAKE_BASE_ADDRESS.to_string())
    }

    async fn make_integrated_address(
        &self,
        base: &str,
        routing_tag: u64,
        correlation_tag: &str,
    ) -> Result<String, LedgerError> {
        let mut addresses = self.addresses.lock().unwrap();
        let address = format!("deroi1{base}{}", addresses.len() + 1);
        addresses.insert(
            address.clone(),
            Arguments::checkout(routing_tag, correlation_tag),
        );
        Ok(address)
    }

    async fn split_integrated_address(
        &self,
        address: &str,
    ) -> Result<IntegratedAddress, LedgerError> {
        self.split_calls.fetch_add(1, Ordering::SeqCst);
        let arguments = self
            .addresses
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .ok_or_else(|| LedgerError::Rpc {
                code: -32098,
                message: format!("invalid integrated address {address}"),
            })?;
        Ok(IntegratedAddress {
            address: FAKE_BASE_ADDRESS.to_string(),
            arguments,
        })
    }

    async fn get_incoming_transfers(
        &self,
        routing_tag: u64,
        asset: &str,
    ) -> Result<Vec<TransferEntry>, LedgerError> {
        self.transfer_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.fail_transfers) {
            return Err(LedgerError::Transport("connection reset".to_string()));
        }
        Ok(self
            .transfers
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, e)| a == asset && e.destination_port == routing_tag)
            .map(|(_, e)| e.clone())
            .collect())
    }
}
