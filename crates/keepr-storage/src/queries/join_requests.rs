// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Join-request watchlist operations.
//!
//! Rows are created when a wallet signals intent to join a gated group and
//! polled by the watchlist until an eligibility decision can be reached.

use rusqlite::params;

use keepr_core::types::{JoinRequest, JoinRequestStatus};
use keepr_core::KeeprError;

use crate::database::Database;
use crate::queries::column_enum;

const SELECT_COLUMNS: &str = "id, vault_address, group_id, wallet_address, status, action_id,
     last_reason, last_checked_at, next_check_at, created_at, updated_at";

fn row_to_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<JoinRequest> {
    Ok(JoinRequest {
        id: row.get(0)?,
        vault_address: row.get(1)?,
        group_id: row.get(2)?,
        wallet_address: row.get(3)?,
        status: column_enum::<JoinRequestStatus>(4, row.get(4)?)?,
        action_id: row.get(5)?,
        last_reason: row.get(6)?,
        last_checked_at: row.get(7)?,
        next_check_at: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Record a new watch for a wallet joining a group. Immediately due.
///
/// Returns the existing row's id when a watch for this (group, wallet) is
/// already live.
pub async fn insert_watch(
    db: &Database,
    vault_address: &str,
    group_id: &str,
    wallet_address: &str,
) -> Result<i64, KeeprError> {
    let vault_address = vault_address.to_string();
    let group_id = group_id.to_string();
    let wallet_address = wallet_address.to_string();
    db.connection()
        .call(move |conn| {
            let existing = conn.query_row(
                "SELECT id FROM join_requests
                 WHERE group_id = ?1 AND wallet_address = ?2 AND status = 'watching'",
                params![group_id, wallet_address],
                |row| row.get::<_, i64>(0),
            );
            match existing {
                Ok(id) => Ok(id),
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    conn.execute(
                        "INSERT INTO join_requests
                             (vault_address, group_id, wallet_address, status, next_check_at)
                         VALUES (?1, ?2, ?3, 'watching',
                                 strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                        params![vault_address, group_id, wallet_address],
                    )?;
                    Ok(conn.last_insert_rowid())
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Select up to `limit` due watching rows, oldest-updated first.
pub async fn due_batch(db: &Database, limit: usize) -> Result<Vec<JoinRequest>, KeeprError> {
    let limit = limit as i64;
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM join_requests
                 WHERE status = 'watching'
                   AND (next_check_at IS NULL
                        OR next_check_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 ORDER BY updated_at ASC, id ASC
                 LIMIT ?1"
            ))?;
            let requests = stmt
                .query_map(params![limit], row_to_request)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(requests)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Transition a request to `queued`, linking the enqueued action.
pub async fn mark_queued(db: &Database, id: i64, action_id: i64) -> Result<(), KeeprError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE join_requests
                 SET status = 'queued',
                     action_id = ?2,
                     last_reason = NULL,
                     last_checked_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, action_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Terminally fail a request (unsupported or misconfigured gating).
pub async fn mark_failed(db: &Database, id: i64, reason: &str) -> Result<(), KeeprError> {
    let reason = reason.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE join_requests
                 SET status = 'failed',
                     last_reason = ?2,
                     last_checked_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, reason],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Keep a request watching: record why it is not yet decided and when to
/// look again.
pub async fn reschedule(
    db: &Database,
    id: i64,
    reason: &str,
    next_check_at: &str,
) -> Result<(), KeeprError> {
    let reason = reason.to_string();
    let next_check_at = next_check_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE join_requests
                 SET last_reason = ?2,
                     next_check_at = ?3,
                     last_checked_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, reason, next_check_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch a single request by id.
pub async fn get_request(db: &Database, id: i64) -> Result<Option<JoinRequest>, KeeprError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM join_requests WHERE id = ?1"),
                params![id],
                row_to_request,
            );
            match result {
                Ok(request) => Ok(Some(request)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count join requests grouped by status.
pub async fn count_by_status(
    db: &Database,
) -> Result<Vec<(JoinRequestStatus, i64)>, KeeprError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT status, COUNT(*) FROM join_requests GROUP BY status ORDER BY status",
            )?;
            let counts = stmt
                .query_map([], |row| {
                    let status = column_enum::<JoinRequestStatus>(0, row.get(0)?)?;
                    Ok((status, row.get::<_, i64>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(counts)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
