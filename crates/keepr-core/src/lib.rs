// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Keepr gated-membership engine.
//!
//! This crate provides the error type, domain types, and the capability
//! traits (messaging network, blockchain reads) that the engine crates
//! build on. It contains no I/O of its own.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{KeeprError, MessagingErrorKind};
pub use traits::{GroupClient, ShareReader};
pub use types::{
    Action, ActionPayload, ActionStatus, ActionType, EligibilityEvidence, EligibilityReason,
    EligibilityResult, GatingMode, GroupMember, JoinRequest, JoinRequestStatus, Vault,
    VaultRateLimits,
};
