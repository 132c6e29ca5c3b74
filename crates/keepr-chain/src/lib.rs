// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-chain share balance reads over JSON-RPC and the eligibility oracle
//! that turns those reads into membership verdicts.

pub mod oracle;
pub mod reader;

pub use oracle::{Oracle, QuorumDecision, QuorumOutcome};
pub use reader::JsonRpcShareReader;
