// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability trait definitions for the external collaborators the engine
//! consumes.
//!
//! Concrete adapters (messaging SDK versions, RPC transports) live in their
//! own crates and implement these traits; the engine only ever sees the
//! trait objects.

pub mod chain;
pub mod group;

pub use chain::ShareReader;
pub use group::GroupClient;
