// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock group client for deterministic testing.
//!
//! `MockGroupClient` implements `GroupClient` with in-memory membership,
//! a wallet-to-identity registry, and one-shot failure injection so the
//! executor's classification paths can be exercised without a network.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use keepr_core::types::{GatingMode, GroupMember, Vault, VaultRateLimits};
use keepr_core::{GroupClient, KeeprError, MessagingErrorKind};

#[derive(Default)]
struct FailureScript {
    add: Option<MessagingErrorKind>,
    remove: Option<MessagingErrorKind>,
    list: Option<MessagingErrorKind>,
    resolve: Option<MessagingErrorKind>,
    enforce: Option<MessagingErrorKind>,
    sync: Option<MessagingErrorKind>,
}

/// An in-memory messaging network.
///
/// Membership mutations apply to an internal map; `fail_next_*` arms a
/// one-shot error that the next matching call returns instead.
#[derive(Default)]
pub struct MockGroupClient {
    members: Mutex<HashMap<String, Vec<GroupMember>>>,
    identities: Mutex<HashMap<String, String>>,
    failures: Mutex<FailureScript>,
    calls: Mutex<Vec<String>>,
}

impl MockGroupClient {
    /// Register a wallet's messaging identity.
    pub fn register_wallet(&self, wallet_address: &str, member_id: &str) {
        self.identities
            .lock()
            .unwrap()
            .insert(wallet_address.to_string(), member_id.to_string());
    }

    /// Place a member directly into a group.
    pub fn seed_member(&self, group_id: &str, member_id: &str, wallet_address: Option<&str>) {
        self.members
            .lock()
            .unwrap()
            .entry(group_id.to_string())
            .or_default()
            .push(GroupMember {
                member_id: member_id.to_string(),
                wallet_address: wallet_address.map(str::to_string),
            });
    }

    pub fn is_member(&self, group_id: &str, member_id: &str) -> bool {
        self.members
            .lock()
            .unwrap()
            .get(group_id)
            .is_some_and(|members| members.iter().any(|m| m.member_id == member_id))
    }

    pub fn members_of(&self, group_id: &str) -> Vec<GroupMember> {
        self.members
            .lock()
            .unwrap()
            .get(group_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Every operation performed, in order, as `"op:group_or_wallet"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_next_add(&self, kind: MessagingErrorKind) {
        self.failures.lock().unwrap().add = Some(kind);
    }

    pub fn fail_next_remove(&self, kind: MessagingErrorKind) {
        self.failures.lock().unwrap().remove = Some(kind);
    }

    pub fn fail_next_list(&self, kind: MessagingErrorKind) {
        self.failures.lock().unwrap().list = Some(kind);
    }

    pub fn fail_next_resolve(&self, kind: MessagingErrorKind) {
        self.failures.lock().unwrap().resolve = Some(kind);
    }

    pub fn fail_enforce_policies(&self, kind: MessagingErrorKind) {
        self.failures.lock().unwrap().enforce = Some(kind);
    }

    pub fn fail_next_sync(&self, kind: MessagingErrorKind) {
        self.failures.lock().unwrap().sync = Some(kind);
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn take_failure(
        &self,
        pick: impl FnOnce(&mut FailureScript) -> &mut Option<MessagingErrorKind>,
        op: &str,
    ) -> Result<(), KeeprError> {
        match pick(&mut self.failures.lock().unwrap()).take() {
            Some(kind) => Err(KeeprError::messaging(kind, format!("scripted {op} failure"))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl GroupClient for MockGroupClient {
    async fn conversation_exists(&self, group_id: &str) -> Result<bool, KeeprError> {
        self.record(format!("exists:{group_id}"));
        Ok(self.members.lock().unwrap().contains_key(group_id))
    }

    async fn list_members(&self, group_id: &str) -> Result<Vec<GroupMember>, KeeprError> {
        self.record(format!("list:{group_id}"));
        self.take_failure(|f| &mut f.list, "list_members")?;
        Ok(self.members_of(group_id))
    }

    async fn add_members(&self, group_id: &str, member_ids: &[String]) -> Result<(), KeeprError> {
        self.record(format!("add:{group_id}"));
        self.take_failure(|f| &mut f.add, "add_members")?;
        let identities = self.identities.lock().unwrap().clone();
        let mut members = self.members.lock().unwrap();
        let group = members.entry(group_id.to_string()).or_default();
        for member_id in member_ids {
            if group.iter().any(|m| &m.member_id == member_id) {
                continue;
            }
            let wallet_address = identities
                .iter()
                .find(|(_, id)| *id == member_id)
                .map(|(wallet, _)| wallet.clone());
            group.push(GroupMember {
                member_id: member_id.clone(),
                wallet_address,
            });
        }
        Ok(())
    }

    async fn remove_members(
        &self,
        group_id: &str,
        member_ids: &[String],
    ) -> Result<(), KeeprError> {
        self.record(format!("remove:{group_id}"));
        self.take_failure(|f| &mut f.remove, "remove_members")?;
        if let Some(group) = self.members.lock().unwrap().get_mut(group_id) {
            group.retain(|m| !member_ids.contains(&m.member_id));
        }
        Ok(())
    }

    async fn resolve_member_id(&self, wallet_address: &str) -> Result<Option<String>, KeeprError> {
        self.record(format!("resolve:{wallet_address}"));
        self.take_failure(|f| &mut f.resolve, "resolve_member_id")?;
        Ok(self.identities.lock().unwrap().get(wallet_address).cloned())
    }

    async fn sync_conversation(&self, group_id: &str) -> Result<(), KeeprError> {
        self.record(format!("sync:{group_id}"));
        self.take_failure(|f| &mut f.sync, "sync_conversation")
    }

    async fn enforce_admin_policies(
        &self,
        group_id: &str,
        _owner_address: &str,
    ) -> Result<(), KeeprError> {
        self.record(format!("enforce:{group_id}"));
        self.take_failure(|f| &mut f.enforce, "enforce_admin_policies")
    }
}

/// A share-gated vault fixture: token `0xtoken`, threshold 100, fail-closed.
pub fn test_vault(group_id: &str, gating_enabled: bool) -> Vault {
    Vault {
        group_id: group_id.to_string(),
        vault_address: "0xvault".to_string(),
        canonical_owner_address: "0xowner".to_string(),
        gating_enabled,
        gating_mode: GatingMode::Shares,
        share_token_address: Some("0xtoken".to_string()),
        min_shares: Some(100),
        fail_closed: true,
        rate_limits: VaultRateLimits::default(),
        last_sync_at: None,
        sync_cursor: 0,
        created_at: "2026-01-01T00:00:00.000Z".to_string(),
        updated_at: "2026-01-01T00:00:00.000Z".to_string(),
    }
}
