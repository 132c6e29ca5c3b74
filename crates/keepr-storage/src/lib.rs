// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Keepr gating engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed query
//! modules for vault configuration, the action queue, and the join-request
//! watchlist. The action queue's claim operation stays safe under multiple
//! concurrent workers: claiming is a conditional single-row update, never a
//! separate lock.

pub mod backoff;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod time;

pub use backoff::backoff;
pub use database::Database;
pub use models::*;
