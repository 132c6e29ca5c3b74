// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Keepr integration tests.
//!
//! Provides in-memory mock adapters so the engine's decision paths can be
//! exercised without a messaging network or an RPC endpoint:
//!
//! - [`MockGroupClient`] - scriptable in-memory group membership
//! - [`FakeShareReader`] - scripted share balances per wallet and endpoint
//! - [`test_vault`] - a share-gated vault fixture

pub mod mock_groups;
pub mod mock_reader;

pub use mock_groups::{test_vault, MockGroupClient};
pub use mock_reader::FakeShareReader;
