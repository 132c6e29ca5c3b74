// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Keepr membership engine.
//!
//! Ties the storage queue, the eligibility oracle, and a messaging-network
//! adapter together into one periodic loop:
//!
//! - [`executor`] drains claimed actions against the network
//! - [`watchlist`] decides pending join requests
//! - [`reconciler`] sweeps current members against the gating policy
//! - [`runtime`] schedules the above on a fixed tick with isolated stages
//! - [`cooldown`] bounds how often command-triggered syncs may run

pub mod cooldown;
pub mod executor;
pub mod reconciler;
pub mod runtime;
pub mod shutdown;
pub mod watchlist;

pub use cooldown::CooldownCache;
pub use executor::{ExecutionOutcome, Executor};
pub use reconciler::{Reconciler, SyncReport};
pub use runtime::{EngineLoop, ManualSyncOutcome};
pub use shutdown::install_signal_handler;
pub use watchlist::Watchlist;
