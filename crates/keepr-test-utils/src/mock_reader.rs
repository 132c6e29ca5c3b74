// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted share reader for oracle and engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use keepr_core::{KeeprError, ShareReader};

/// A share reader answering from a wallet-to-balance map.
///
/// Wallets without a scripted balance read as zero. Endpoints added to the
/// failing set error instead of answering, which is how tests drive the
/// oracle's ordered fallback and quorum paths.
#[derive(Default)]
pub struct FakeShareReader {
    balances: Mutex<HashMap<String, u128>>,
    failing_endpoints: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeShareReader {
    pub fn set_balance(&self, wallet_address: &str, balance: u128) {
        self.balances
            .lock()
            .unwrap()
            .insert(wallet_address.to_string(), balance);
    }

    /// Make an endpoint fail every read until restored.
    pub fn fail_endpoint(&self, rpc_url: &str) {
        self.failing_endpoints
            .lock()
            .unwrap()
            .insert(rpc_url.to_string());
    }

    pub fn restore_endpoint(&self, rpc_url: &str) {
        self.failing_endpoints.lock().unwrap().remove(rpc_url);
    }

    /// Every read performed, as `(rpc_url, wallet_address)` in order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ShareReader for FakeShareReader {
    async fn share_balance(
        &self,
        rpc_url: &str,
        wallet_address: &str,
        _token_address: &str,
    ) -> Result<u128, KeeprError> {
        self.calls
            .lock()
            .unwrap()
            .push((rpc_url.to_string(), wallet_address.to_string()));
        if self.failing_endpoints.lock().unwrap().contains(rpc_url) {
            return Err(KeeprError::Chain {
                message: format!("scripted failure for {rpc_url}"),
                source: None,
            });
        }
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(wallet_address)
            .copied()
            .unwrap_or(0))
    }
}
