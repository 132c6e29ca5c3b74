// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common domain types shared across the Keepr crates.
//!
//! Timestamps are ISO-8601 UTC strings (`%Y-%m-%dT%H:%M:%S%.3fZ`) so SQLite
//! ordering and comparisons work lexicographically; the storage crate owns
//! their generation.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The kind of side-effecting membership mutation an action performs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    AddMember,
    RemoveMember,
}

/// Action queue states.
///
/// `Executing` is not a resting state: a row left there by a crash is
/// returned to `Retry` by the stale-row sweep.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Retry,
    Executing,
    Executed,
    Failed,
    NeedsUserSetup,
}

impl ActionStatus {
    /// Terminal states never transition again; a dedupe key held by a
    /// terminal row no longer blocks a fresh enqueue.
    pub fn is_terminal(self) -> bool {
        matches!(self, ActionStatus::Executed | ActionStatus::Failed)
    }
}

/// Join-request states. `Queued` and `Failed` are terminal for the watchlist.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JoinRequestStatus {
    Watching,
    Queued,
    Failed,
}

/// How a vault gates group membership.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GatingMode {
    None,
    Shares,
}

/// Per-vault rate limits, stored as a JSON config column on `vaults`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultRateLimits {
    /// Minimum spacing between command-triggered operations per (group, wallet).
    pub command_cooldown_ms: u64,
    /// Minimum spacing between reconciliation sweeps for the group.
    pub sync_cooldown_secs: u64,
    /// Members examined per reconciliation invocation.
    pub sync_max_members_per_batch: usize,
}

impl Default for VaultRateLimits {
    fn default() -> Self {
        Self {
            command_cooldown_ms: 10_000,
            sync_cooldown_secs: 600,
            sync_max_members_per_batch: 25,
        }
    }
}

/// A gated chat group and its gating policy.
///
/// Created and updated by an external provisioning flow; read-only to the
/// engine except for `last_sync_at` and `sync_cursor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vault {
    pub group_id: String,
    pub vault_address: String,
    pub canonical_owner_address: String,
    pub gating_enabled: bool,
    pub gating_mode: GatingMode,
    pub share_token_address: Option<String>,
    /// Minimum holding in token base units.
    pub min_shares: Option<u128>,
    /// If true, an indeterminate eligibility read counts as ineligible
    /// for join decisions.
    pub fail_closed: bool,
    pub rate_limits: VaultRateLimits,
    pub last_sync_at: Option<String>,
    /// Member-list offset the next reconciliation sweep resumes from.
    pub sync_cursor: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Vault {
    /// True when the vault is configured for enforceable share gating.
    pub fn shares_gating_configured(&self) -> bool {
        self.gating_enabled
            && self.gating_mode == GatingMode::Shares
            && self.share_token_address.is_some()
            && self.min_shares.is_some()
    }
}

/// One queued side-effecting membership mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: i64,
    pub vault_address: String,
    pub group_id: String,
    pub action_type: ActionType,
    /// Serialized [`ActionPayload`]; opaque to the queue itself.
    pub payload: String,
    pub dedupe_key: String,
    pub status: ActionStatus,
    pub attempt_count: i64,
    pub next_attempt_at: Option<String>,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub executed_at: Option<String>,
}

impl Action {
    /// Deserialize the opaque payload column.
    pub fn parse_payload(&self) -> Result<ActionPayload, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }
}

/// The payload carried by an [`Action`] row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPayload {
    pub kind: ActionType,
    pub group_id: String,
    pub wallet_address: String,
    /// Why the action was enqueued (`gating_disabled`, `shares_eligible`,
    /// `shares_ineligible`, ...).
    pub reason: String,
    /// Evidence from the eligibility checks that produced the decision.
    #[serde(default)]
    pub evidence: Vec<EligibilityEvidence>,
}

/// One wallet's pending entry into one group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub id: i64,
    pub vault_address: String,
    pub group_id: String,
    pub wallet_address: String,
    pub status: JoinRequestStatus,
    pub action_id: Option<i64>,
    pub last_reason: Option<String>,
    pub last_checked_at: Option<String>,
    pub next_check_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Why an eligibility check came out the way it did.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EligibilityReason {
    Ok,
    Ineligible,
    OnchainReadFailed,
}

/// Where an eligibility answer came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityEvidence {
    /// The endpoint that answered (or the last one attempted on total failure).
    pub rpc_url: Option<String>,
    pub block_number: Option<u64>,
    pub balance: Option<u128>,
}

/// Outcome of a single oracle check. Never persisted directly; evidence is
/// serialized into action payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub eligible: bool,
    pub reason: EligibilityReason,
    pub evidence: EligibilityEvidence,
}

impl EligibilityResult {
    /// True when the check could not read the chain at all.
    pub fn is_indeterminate(&self) -> bool {
        self.reason == EligibilityReason::OnchainReadFailed
    }
}

/// A current member of a conversation, as reported by the messaging network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub member_id: String,
    /// The wallet behind the member identity, when the network can surface it.
    pub wallet_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn action_status_terminality() {
        assert!(ActionStatus::Executed.is_terminal());
        assert!(ActionStatus::Failed.is_terminal());
        assert!(!ActionStatus::Pending.is_terminal());
        assert!(!ActionStatus::Retry.is_terminal());
        assert!(!ActionStatus::Executing.is_terminal());
        assert!(!ActionStatus::NeedsUserSetup.is_terminal());
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            ActionStatus::Pending,
            ActionStatus::Retry,
            ActionStatus::Executing,
            ActionStatus::Executed,
            ActionStatus::Failed,
            ActionStatus::NeedsUserSetup,
        ] {
            let s = status.to_string();
            assert_eq!(ActionStatus::from_str(&s).unwrap(), status);
        }
        assert_eq!(ActionStatus::NeedsUserSetup.to_string(), "needs_user_setup");
        assert_eq!(ActionType::AddMember.to_string(), "add_member");
        assert_eq!(GatingMode::Shares.to_string(), "shares");
    }

    #[test]
    fn vault_shares_gating_requires_token_and_threshold() {
        let mut vault = Vault {
            group_id: "g1".into(),
            vault_address: "0xvault".into(),
            canonical_owner_address: "0xowner".into(),
            gating_enabled: true,
            gating_mode: GatingMode::Shares,
            share_token_address: Some("0xtoken".into()),
            min_shares: Some(100),
            fail_closed: true,
            rate_limits: VaultRateLimits::default(),
            last_sync_at: None,
            sync_cursor: 0,
            created_at: "2026-01-01T00:00:00.000Z".into(),
            updated_at: "2026-01-01T00:00:00.000Z".into(),
        };
        assert!(vault.shares_gating_configured());

        vault.min_shares = None;
        assert!(!vault.shares_gating_configured());

        vault.min_shares = Some(100);
        vault.gating_mode = GatingMode::None;
        assert!(!vault.shares_gating_configured());

        vault.gating_mode = GatingMode::Shares;
        vault.gating_enabled = false;
        assert!(!vault.shares_gating_configured());
    }

    #[test]
    fn rate_limit_defaults() {
        let limits: VaultRateLimits = serde_json::from_str("{}").unwrap();
        assert_eq!(limits.command_cooldown_ms, 10_000);
        assert_eq!(limits.sync_cooldown_secs, 600);
        assert_eq!(limits.sync_max_members_per_batch, 25);
    }

    #[test]
    fn action_payload_round_trips_with_evidence() {
        let payload = ActionPayload {
            kind: ActionType::AddMember,
            group_id: "g1".into(),
            wallet_address: "0xabc".into(),
            reason: "shares_eligible".into(),
            evidence: vec![EligibilityEvidence {
                rpc_url: Some("https://rpc.example/1".into()),
                block_number: None,
                balance: Some(150),
            }],
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains(r#""kind":"add_member""#), "{json}");

        let action = Action {
            id: 1,
            vault_address: "0xvault".into(),
            group_id: "g1".into(),
            action_type: ActionType::AddMember,
            payload: json,
            dedupe_key: "join:add_member:0xvault:g1:0xabc".into(),
            status: ActionStatus::Pending,
            attempt_count: 0,
            next_attempt_at: None,
            last_error: None,
            created_at: "2026-01-01T00:00:00.000Z".into(),
            updated_at: "2026-01-01T00:00:00.000Z".into(),
            executed_at: None,
        };
        let parsed = action.parse_payload().unwrap();
        assert_eq!(parsed.wallet_address, "0xabc");
        assert_eq!(parsed.evidence[0].balance, Some(150));
    }

    #[test]
    fn eligibility_result_indeterminacy() {
        let failed = EligibilityResult {
            eligible: false,
            reason: EligibilityReason::OnchainReadFailed,
            evidence: EligibilityEvidence::default(),
        };
        assert!(failed.is_indeterminate());

        let ineligible = EligibilityResult {
            eligible: false,
            reason: EligibilityReason::Ineligible,
            evidence: EligibilityEvidence::default(),
        };
        assert!(!ineligible.is_indeterminate());
    }
}
