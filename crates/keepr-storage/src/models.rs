// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types live in `keepr-core::types` for use across the
//! capability trait boundaries. This module re-exports them for convenience
//! within the storage crate.

pub use keepr_core::types::{
    Action, ActionPayload, ActionStatus, ActionType, JoinRequest, JoinRequestStatus, Vault,
    VaultRateLimits,
};
