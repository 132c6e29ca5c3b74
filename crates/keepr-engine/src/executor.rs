// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Action executor: drains claimed queue rows against the messaging network.
//!
//! Every failure lands the row in exactly one bucket: retry (transient),
//! failed (the call can never succeed as written), or needs_user_setup
//! (the wallet has no messaging identity and only the user can fix that).

use std::sync::Arc;

use tracing::{debug, info, warn};

use keepr_core::types::{Action, ActionType};
use keepr_core::{GroupClient, KeeprError, MessagingErrorKind};
use keepr_storage::queries::{actions, vaults};
use keepr_storage::{backoff, time, Database};

/// How a single action execution concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Executed,
    Retried { next_attempt_at: String },
    Failed,
    NeedsUserSetup,
}

pub struct Executor {
    db: Arc<Database>,
    groups: Arc<dyn GroupClient>,
}

impl Executor {
    pub fn new(db: Arc<Database>, groups: Arc<dyn GroupClient>) -> Self {
        Self { db, groups }
    }

    /// Claim up to `limit` due actions and execute each in turn.
    ///
    /// Returns the number of actions claimed. Storage errors abort the
    /// batch; per-action messaging failures are absorbed into the row's
    /// state transition and never stop the rest of the batch.
    pub async fn run_batch(&self, limit: usize) -> Result<usize, KeeprError> {
        let claimed = actions::claim_batch(&self.db, limit).await?;
        let count = claimed.len();
        for action in claimed {
            self.execute(&action).await?;
        }
        Ok(count)
    }

    /// Execute one claimed action and record its outcome.
    pub async fn execute(&self, action: &Action) -> Result<ExecutionOutcome, KeeprError> {
        let payload = match action.parse_payload() {
            Ok(payload) => payload,
            Err(e) => {
                // A payload this process wrote and cannot read back will
                // never become readable by retrying.
                warn!(action_id = action.id, error = %e, "unreadable action payload");
                actions::mark_failed(&self.db, action.id, &format!("unreadable payload: {e}"))
                    .await?;
                return Ok(ExecutionOutcome::Failed);
            }
        };

        let vault = match vaults::get_by_group(&self.db, &action.group_id).await? {
            Some(vault) => vault,
            None => {
                actions::mark_failed(&self.db, action.id, "no vault for group").await?;
                return Ok(ExecutionOutcome::Failed);
            }
        };

        // Best effort: a group that drifted out of policy or out of sync
        // should be corrected before mutating membership, but neither
        // failing is a reason to burn the attempt.
        if let Err(e) = self
            .groups
            .enforce_admin_policies(&action.group_id, &vault.canonical_owner_address)
            .await
        {
            warn!(group_id = %action.group_id, error = %e, "admin policy enforcement failed");
        }
        if let Err(e) = self.groups.sync_conversation(&action.group_id).await {
            warn!(group_id = %action.group_id, error = %e, "conversation sync failed");
        }

        let member_id = match self.groups.resolve_member_id(&payload.wallet_address).await {
            Ok(Some(member_id)) => member_id,
            Ok(None) => {
                info!(
                    action_id = action.id,
                    wallet_address = %payload.wallet_address,
                    "wallet has no messaging identity"
                );
                actions::mark_needs_user_setup(
                    &self.db,
                    action.id,
                    "wallet has no registered messaging identity",
                )
                .await?;
                return Ok(ExecutionOutcome::NeedsUserSetup);
            }
            Err(e) => return self.record_failure(action, e).await,
        };

        let result = match action.action_type {
            ActionType::AddMember => self.add_member(&action.group_id, &member_id).await,
            ActionType::RemoveMember => {
                // Removing a non-member is a no-op by the adapter contract,
                // so no membership pre-check is needed.
                self.groups
                    .remove_members(&action.group_id, &[member_id.clone()])
                    .await
            }
        };

        match result {
            Ok(()) => {
                actions::mark_executed(&self.db, action.id).await?;
                info!(
                    action_id = action.id,
                    action_type = %action.action_type,
                    group_id = %action.group_id,
                    wallet_address = %payload.wallet_address,
                    "action executed"
                );
                Ok(ExecutionOutcome::Executed)
            }
            Err(e) => self.record_failure(action, e).await,
        }
    }

    /// Membership-idempotent add: if the identity is already a member the
    /// action already holds, so it succeeds without another mutation.
    async fn add_member(&self, group_id: &str, member_id: &str) -> Result<(), KeeprError> {
        let members = self.groups.list_members(group_id).await?;
        if members.iter().any(|m| m.member_id == member_id) {
            debug!(group_id, member_id, "already a member, nothing to add");
            return Ok(());
        }
        self.groups
            .add_members(group_id, &[member_id.to_string()])
            .await
    }

    async fn record_failure(
        &self,
        action: &Action,
        error: KeeprError,
    ) -> Result<ExecutionOutcome, KeeprError> {
        match classify(&error) {
            FailureClass::NeedsUserSetup => {
                actions::mark_needs_user_setup(&self.db, action.id, &error.to_string()).await?;
                Ok(ExecutionOutcome::NeedsUserSetup)
            }
            FailureClass::Terminal => {
                warn!(action_id = action.id, error = %error, "action failed terminally");
                actions::mark_failed(&self.db, action.id, &error.to_string()).await?;
                Ok(ExecutionOutcome::Failed)
            }
            FailureClass::Transient => {
                let delay = backoff(action.attempt_count.max(0) as u32);
                let next_attempt_at = time::iso_after(delay);
                debug!(
                    action_id = action.id,
                    attempt = action.attempt_count,
                    delay_secs = delay.as_secs(),
                    error = %error,
                    "transient failure, scheduling retry"
                );
                actions::mark_retry(&self.db, action.id, &error.to_string(), &next_attempt_at)
                    .await?;
                Ok(ExecutionOutcome::Retried { next_attempt_at })
            }
        }
    }
}

enum FailureClass {
    Transient,
    Terminal,
    NeedsUserSetup,
}

/// Map an execution error to a queue transition.
///
/// Only a request the network rejected as inherently invalid is terminal;
/// everything ambiguous retries, because a gating engine that silently
/// drops membership mutations is worse than one that retries too long.
fn classify(error: &KeeprError) -> FailureClass {
    match error.messaging_kind() {
        Some(MessagingErrorKind::IdentityNotRegistered) => FailureClass::NeedsUserSetup,
        Some(MessagingErrorKind::InvalidRequest | MessagingErrorKind::PermissionDenied) => {
            FailureClass::Terminal
        }
        Some(
            MessagingErrorKind::ConversationNotFound
            | MessagingErrorKind::RateLimited
            | MessagingErrorKind::Timeout
            | MessagingErrorKind::Transport
            | MessagingErrorKind::Other,
        ) => FailureClass::Transient,
        None => FailureClass::Transient,
    }
}
