// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging-network capability consumed by the membership engine.

use async_trait::async_trait;

use crate::error::KeeprError;
use crate::types::GroupMember;

/// Opaque capability over the messaging network's group surface.
///
/// One adapter exists per SDK/gateway version; defensive shape-probing
/// against an evolving SDK belongs in the adapter, never in the engine.
/// Adapters must report failures as [`KeeprError::Messaging`] with an
/// accurate [`MessagingErrorKind`](crate::error::MessagingErrorKind) so the
/// action queue can classify them.
#[async_trait]
pub trait GroupClient: Send + Sync {
    /// Returns whether the conversation is currently visible to the bot.
    async fn conversation_exists(&self, group_id: &str) -> Result<bool, KeeprError>;

    /// Lists current members of the conversation.
    async fn list_members(&self, group_id: &str) -> Result<Vec<GroupMember>, KeeprError>;

    /// Adds the given member identities to the conversation.
    async fn add_members(&self, group_id: &str, member_ids: &[String]) -> Result<(), KeeprError>;

    /// Removes the given member identities from the conversation.
    ///
    /// Removing a non-member must be a harmless no-op.
    async fn remove_members(&self, group_id: &str, member_ids: &[String])
        -> Result<(), KeeprError>;

    /// Resolves a wallet address to a messaging member identity.
    ///
    /// Returns `Ok(None)` when the wallet has no registered identity yet --
    /// a precondition failure, not a transport error.
    async fn resolve_member_id(&self, wallet_address: &str) -> Result<Option<String>, KeeprError>;

    /// Pulls the latest conversation state from the network.
    async fn sync_conversation(&self, group_id: &str) -> Result<(), KeeprError>;

    /// Asserts the group-level admin invariants: only admins may mutate
    /// membership, metadata is admin-locked, and the canonical owner holds
    /// an admin role. Idempotent; safe to call before every mutation.
    async fn enforce_admin_policies(
        &self,
        group_id: &str,
        owner_address: &str,
    ) -> Result<(), KeeprError>;
}
