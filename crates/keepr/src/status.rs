// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `keepr status` command implementation.
//!
//! Reads the local database directly and summarizes the action queue, the
//! join-request watchlist, and per-vault sync state. Works whether or not
//! the engine is running; the database is the source of truth either way.

use serde::Serialize;

use keepr_config::KeeprConfig;
use keepr_core::KeeprError;
use keepr_storage::queries::{actions, join_requests, vaults};
use keepr_storage::Database;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub actions: Vec<StatusCount>,
    pub join_requests: Vec<StatusCount>,
    pub vaults: Vec<VaultStatus>,
}

#[derive(Debug, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct VaultStatus {
    pub group_id: String,
    pub gating_mode: String,
    pub fail_closed: bool,
    pub last_sync_at: Option<String>,
    pub sync_cursor: i64,
}

/// Run the `keepr status` command.
pub async fn run_status(config: &KeeprConfig, json: bool) -> Result<(), KeeprError> {
    let db =
        Database::open_with_options(&config.storage.database_path, config.storage.wal_mode)
            .await?;

    let report = StatusReport {
        actions: actions::count_by_status(&db)
            .await?
            .into_iter()
            .map(|(status, count)| StatusCount {
                status: status.to_string(),
                count,
            })
            .collect(),
        join_requests: join_requests::count_by_status(&db)
            .await?
            .into_iter()
            .map(|(status, count)| StatusCount {
                status: status.to_string(),
                count,
            })
            .collect(),
        vaults: vaults::list_gated(&db)
            .await?
            .into_iter()
            .map(|v| VaultStatus {
                group_id: v.group_id,
                gating_mode: v.gating_mode.to_string(),
                fail_closed: v.fail_closed,
                last_sync_at: v.last_sync_at,
                sync_cursor: v.sync_cursor,
            })
            .collect(),
    };
    db.close().await?;

    if json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| KeeprError::Internal(format!("status serialization failed: {e}")))?;
        println!("{rendered}");
        return Ok(());
    }

    println!("actions:");
    if report.actions.is_empty() {
        println!("  (none)");
    }
    for entry in &report.actions {
        println!("  {:<18} {}", entry.status, entry.count);
    }

    println!("join requests:");
    if report.join_requests.is_empty() {
        println!("  (none)");
    }
    for entry in &report.join_requests {
        println!("  {:<18} {}", entry.status, entry.count);
    }

    println!("gated vaults:");
    if report.vaults.is_empty() {
        println!("  (none)");
    }
    for vault in &report.vaults {
        println!(
            "  {} mode={} fail_closed={} last_sync={} cursor={}",
            vault.group_id,
            vault.gating_mode,
            vault.fail_closed,
            vault.last_sync_at.as_deref().unwrap_or("never"),
            vault.sync_cursor,
        );
    }

    Ok(())
}
