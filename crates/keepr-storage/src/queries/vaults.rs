// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault (gated group) configuration reads and the two columns the engine
//! owns: `last_sync_at` and `sync_cursor`.

use rusqlite::params;

use keepr_core::types::{GatingMode, Vault, VaultRateLimits};
use keepr_core::KeeprError;

use crate::database::Database;
use crate::queries::column_enum;

const SELECT_COLUMNS: &str = "group_id, vault_address, canonical_owner_address, gating_enabled,
     gating_mode, share_token_address, min_shares, fail_closed, config, last_sync_at,
     sync_cursor, created_at, updated_at";

fn row_to_vault(row: &rusqlite::Row<'_>) -> rusqlite::Result<Vault> {
    let min_shares: Option<String> = row.get(6)?;
    let min_shares = match min_shares {
        Some(raw) => Some(raw.parse::<u128>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?),
        None => None,
    };
    let config_json: String = row.get(8)?;
    let rate_limits: VaultRateLimits = serde_json::from_str(&config_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Vault {
        group_id: row.get(0)?,
        vault_address: row.get(1)?,
        canonical_owner_address: row.get(2)?,
        gating_enabled: row.get(3)?,
        gating_mode: column_enum::<GatingMode>(4, row.get(4)?)?,
        share_token_address: row.get(5)?,
        min_shares,
        fail_closed: row.get(7)?,
        rate_limits,
        last_sync_at: row.get(9)?,
        sync_cursor: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

/// Insert or replace a vault record (provisioning flows and tests).
pub async fn upsert_vault(db: &Database, vault: &Vault) -> Result<(), KeeprError> {
    let vault = vault.clone();
    let config_json =
        serde_json::to_string(&vault.rate_limits).map_err(|e| KeeprError::Storage {
            source: Box::new(e),
        })?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO vaults
                     (group_id, vault_address, canonical_owner_address, gating_enabled,
                      gating_mode, share_token_address, min_shares, fail_closed, config)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(group_id) DO UPDATE SET
                     vault_address = excluded.vault_address,
                     canonical_owner_address = excluded.canonical_owner_address,
                     gating_enabled = excluded.gating_enabled,
                     gating_mode = excluded.gating_mode,
                     share_token_address = excluded.share_token_address,
                     min_shares = excluded.min_shares,
                     fail_closed = excluded.fail_closed,
                     config = excluded.config,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![
                    vault.group_id,
                    vault.vault_address,
                    vault.canonical_owner_address,
                    vault.gating_enabled,
                    vault.gating_mode.to_string(),
                    vault.share_token_address,
                    vault.min_shares.map(|v| v.to_string()),
                    vault.fail_closed,
                    config_json,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch the vault for a group.
pub async fn get_by_group(db: &Database, group_id: &str) -> Result<Option<Vault>, KeeprError> {
    let group_id = group_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM vaults WHERE group_id = ?1"),
                params![group_id],
                row_to_vault,
            );
            match result {
                Ok(vault) => Ok(Some(vault)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all vaults with gating enabled.
pub async fn list_gated(db: &Database) -> Result<Vec<Vault>, KeeprError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM vaults
                 WHERE gating_enabled = 1
                 ORDER BY group_id"
            ))?;
            let vaults = stmt
                .query_map([], row_to_vault)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(vaults)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record sweep completion time for a group.
pub async fn touch_last_sync(db: &Database, group_id: &str) -> Result<(), KeeprError> {
    let group_id = group_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE vaults
                 SET last_sync_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE group_id = ?1",
                params![group_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Persist the member-list offset the next sweep resumes from.
pub async fn set_sync_cursor(db: &Database, group_id: &str, cursor: i64) -> Result<(), KeeprError> {
    let group_id = group_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE vaults
                 SET sync_cursor = ?2,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE group_id = ?1",
                params![group_id, cursor],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
