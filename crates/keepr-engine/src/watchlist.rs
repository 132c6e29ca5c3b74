// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Join-request watchlist: polls watching rows until an admission decision
//! can be reached, then hands the admission to the action queue.
//!
//! Under a fail-closed vault nobody is admitted on an indeterminate read;
//! the request simply stays on the watchlist and is looked at again soon.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use keepr_chain::{Oracle, QuorumDecision};
use keepr_core::types::{ActionPayload, ActionType, GatingMode, JoinRequest, Vault};
use keepr_core::KeeprError;
use keepr_storage::queries::{actions, join_requests};
use keepr_storage::{time, Database};

/// Recheck delay when the chain could not be read under fail-closed.
const RECHECK_UNVERIFIED: Duration = Duration::from_secs(120);
/// Recheck delay when the wallet was confirmed below the threshold.
const RECHECK_INELIGIBLE: Duration = Duration::from_secs(300);

pub struct Watchlist {
    db: Arc<Database>,
    oracle: Arc<Oracle>,
}

impl Watchlist {
    pub fn new(db: Arc<Database>, oracle: Arc<Oracle>) -> Self {
        Self { db, oracle }
    }

    /// Process up to `limit` due watching rows. Returns how many were looked at.
    pub async fn process_batch(&self, limit: usize) -> Result<usize, KeeprError> {
        let due = join_requests::due_batch(&self.db, limit).await?;
        let count = due.len();
        for request in due {
            self.decide(&request).await?;
        }
        Ok(count)
    }

    async fn decide(&self, request: &JoinRequest) -> Result<(), KeeprError> {
        let vault = match keepr_storage::queries::vaults::get_by_group(&self.db, &request.group_id)
            .await?
        {
            Some(vault) => vault,
            None => {
                warn!(
                    request_id = request.id,
                    group_id = %request.group_id,
                    "join request for a group with no vault"
                );
                join_requests::mark_failed(&self.db, request.id, "no vault for group").await?;
                return Ok(());
            }
        };

        if !vault.gating_enabled || vault.gating_mode == GatingMode::None {
            return self.admit(request, &vault, "gating_disabled", Vec::new()).await;
        }

        // Shares mode from here on.
        let (token, min_shares) = match (&vault.share_token_address, vault.min_shares) {
            (Some(token), Some(min_shares)) => (token.clone(), min_shares),
            _ => {
                warn!(
                    request_id = request.id,
                    group_id = %request.group_id,
                    "share gating enabled but token or threshold missing"
                );
                join_requests::mark_failed(
                    &self.db,
                    request.id,
                    "share gating misconfigured: missing token or threshold",
                )
                .await?;
                return Ok(());
            }
        };

        let outcome = self
            .oracle
            .check_shares_quorum(&request.wallet_address, &token, min_shares)
            .await;
        let evidence: Vec<_> = outcome.checks.iter().map(|c| c.evidence.clone()).collect();
        let any_indeterminate = outcome.checks.iter().any(|c| c.is_indeterminate());

        if outcome.decision == QuorumDecision::Eligible {
            return self.admit(request, &vault, "shares_eligible", evidence).await;
        }

        // Fail-open vaults let an unreadable chain count in the wallet's
        // favor for joins; a confirmed sub-threshold read still blocks.
        let fail_open_pass = !vault.fail_closed
            && outcome
                .checks
                .iter()
                .all(|c| c.eligible || c.is_indeterminate());
        if fail_open_pass {
            return self
                .admit(request, &vault, "shares_eligible_fail_open", evidence)
                .await;
        }

        let (reason, delay) = if vault.fail_closed && any_indeterminate {
            ("verification_failed", RECHECK_UNVERIFIED)
        } else {
            ("ineligible", RECHECK_INELIGIBLE)
        };
        debug!(
            request_id = request.id,
            wallet_address = %request.wallet_address,
            reason,
            recheck_secs = delay.as_secs(),
            "join request not yet admissible"
        );
        join_requests::reschedule(&self.db, request.id, reason, &time::iso_after(delay)).await
    }

    async fn admit(
        &self,
        request: &JoinRequest,
        vault: &Vault,
        reason: &str,
        evidence: Vec<keepr_core::types::EligibilityEvidence>,
    ) -> Result<(), KeeprError> {
        let payload = ActionPayload {
            kind: ActionType::AddMember,
            group_id: request.group_id.clone(),
            wallet_address: request.wallet_address.clone(),
            reason: reason.to_string(),
            evidence,
        };
        let dedupe_key = format!(
            "join:add_member:{}:{}:{}",
            vault.vault_address, request.group_id, request.wallet_address
        );
        let outcome = actions::enqueue(
            &self.db,
            &vault.vault_address,
            &request.group_id,
            ActionType::AddMember,
            &payload,
            &dedupe_key,
        )
        .await?;
        join_requests::mark_queued(&self.db, request.id, outcome.id).await?;
        info!(
            request_id = request.id,
            action_id = outcome.id,
            wallet_address = %request.wallet_address,
            reason,
            "join request queued for admission"
        );
        Ok(())
    }
}
