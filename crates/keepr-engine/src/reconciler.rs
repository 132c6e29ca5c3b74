// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Membership reconciler: sweeps current group members against the gating
//! policy and enqueues removals for wallets that no longer qualify.
//!
//! Removal is the engine's most dangerous operation, so everything here is
//! conservative: only a quorum-confirmed sub-threshold wallet is touched,
//! the canonical owner is never examined, and a member whose wallet cannot
//! be resolved is skipped rather than removed. Sweeps are bounded and
//! resume from a persisted cursor so large groups are covered across
//! several cycles without hammering the RPC endpoints.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use keepr_chain::{Oracle, QuorumDecision};
use keepr_core::types::{ActionPayload, ActionType, Vault};
use keepr_core::{GroupClient, KeeprError};
use keepr_storage::queries::{actions, vaults};
use keepr_storage::Database;

/// What one reconciliation sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub examined: usize,
    pub skipped: usize,
    pub removals_enqueued: usize,
}

pub struct Reconciler {
    db: Arc<Database>,
    oracle: Arc<Oracle>,
    groups: Arc<dyn GroupClient>,
    member_pacing: Duration,
}

impl Reconciler {
    pub fn new(
        db: Arc<Database>,
        oracle: Arc<Oracle>,
        groups: Arc<dyn GroupClient>,
        member_pacing: Duration,
    ) -> Self {
        Self {
            db,
            oracle,
            groups,
            member_pacing,
        }
    }

    /// One bounded sweep over the group's members, resuming from the
    /// vault's persisted cursor.
    ///
    /// `last_sync_at` is recorded whenever the sweep ran at all, even if
    /// every examined member was skipped; cooldown is measured from the
    /// attempt, not from a fully clean pass.
    pub async fn run_sync_for_group(&self, group_id: &str) -> Result<SyncReport, KeeprError> {
        let vault = vaults::get_by_group(&self.db, group_id)
            .await?
            .ok_or_else(|| KeeprError::Internal(format!("no vault for group {group_id}")))?;

        if !vault.shares_gating_configured() {
            debug!(group_id, "share gating not configured, skipping sweep");
            return Ok(SyncReport::default());
        }
        // Checked by shares_gating_configured above.
        let token = vault
            .share_token_address
            .clone()
            .ok_or_else(|| KeeprError::Internal("share token vanished".into()))?;
        let min_shares = vault
            .min_shares
            .ok_or_else(|| KeeprError::Internal("share threshold vanished".into()))?;

        if let Err(e) = self.groups.sync_conversation(group_id).await {
            warn!(group_id, error = %e, "conversation sync failed before sweep");
        }
        let members = self.groups.list_members(group_id).await?;
        if members.is_empty() {
            vaults::touch_last_sync(&self.db, group_id).await?;
            return Ok(SyncReport::default());
        }

        let start = (vault.sync_cursor.max(0) as usize) % members.len();
        let batch = vault
            .rate_limits
            .sync_max_members_per_batch
            .min(members.len());

        let mut report = SyncReport::default();
        for i in 0..batch {
            if i > 0 {
                tokio::time::sleep(self.member_pacing).await;
            }
            let member = &members[(start + i) % members.len()];
            report.examined += 1;

            let wallet = match &member.wallet_address {
                Some(wallet) => wallet,
                None => {
                    // No wallet means no eligibility verdict; never remove
                    // on a missing identity.
                    debug!(
                        group_id,
                        member_id = %member.member_id,
                        "member has no resolvable wallet, skipping"
                    );
                    report.skipped += 1;
                    continue;
                }
            };
            if wallet.eq_ignore_ascii_case(&vault.canonical_owner_address) {
                report.skipped += 1;
                continue;
            }

            let outcome = self
                .oracle
                .check_shares_quorum(wallet, &token, min_shares)
                .await;
            if outcome.decision == QuorumDecision::Ineligible {
                self.enqueue_removal(&vault, wallet, &outcome).await?;
                report.removals_enqueued += 1;
            }
        }

        let next_cursor = ((start + batch) % members.len()) as i64;
        vaults::set_sync_cursor(&self.db, group_id, next_cursor).await?;
        vaults::touch_last_sync(&self.db, group_id).await?;
        info!(
            group_id,
            examined = report.examined,
            skipped = report.skipped,
            removals = report.removals_enqueued,
            next_cursor,
            "reconciliation sweep complete"
        );
        Ok(report)
    }

    async fn enqueue_removal(
        &self,
        vault: &Vault,
        wallet: &str,
        outcome: &keepr_chain::QuorumOutcome,
    ) -> Result<(), KeeprError> {
        let payload = ActionPayload {
            kind: ActionType::RemoveMember,
            group_id: vault.group_id.clone(),
            wallet_address: wallet.to_string(),
            reason: "shares_ineligible".to_string(),
            evidence: outcome.checks.iter().map(|c| c.evidence.clone()).collect(),
        };
        let dedupe_key = format!(
            "sync:remove_member:{}:{}:{}",
            vault.vault_address, vault.group_id, wallet
        );
        let enqueued = actions::enqueue(
            &self.db,
            &vault.vault_address,
            &vault.group_id,
            ActionType::RemoveMember,
            &payload,
            &dedupe_key,
        )
        .await?;
        info!(
            action_id = enqueued.id,
            created = enqueued.created,
            group_id = %vault.group_id,
            wallet_address = wallet,
            "removal enqueued for ineligible member"
        );
        Ok(())
    }
}
