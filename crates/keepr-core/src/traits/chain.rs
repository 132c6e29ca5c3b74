// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blockchain read capability consumed by the eligibility oracle.

use async_trait::async_trait;

use crate::error::KeeprError;

/// A single-capability blockchain reader: share balances, nothing else.
///
/// Implementations own their per-call timeout. The oracle walks an ordered
/// endpoint list and calls this once per endpoint; retry-with-delay is the
/// caller's job.
#[async_trait]
pub trait ShareReader: Send + Sync {
    /// Reads the holder's balance of the share token, in base units.
    async fn share_balance(
        &self,
        rpc_url: &str,
        wallet_address: &str,
        token_address: &str,
    ) -> Result<u128, KeeprError>;
}
