// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Action queue operations: idempotent enqueue, claim, and the
//! retry/terminal state transitions.
//!
//! All membership mutations flow through this queue, so the two invariants
//! here are load-bearing:
//! - at most one non-terminal row per `dedupe_key` (partial unique index +
//!   check-then-insert on the single writer thread);
//! - a row is claimed by exactly one worker (conditional single-row UPDATE,
//!   losers see zero affected rows and skip).

use rusqlite::params;
use tracing::debug;

use keepr_core::types::{Action, ActionPayload, ActionStatus, ActionType};
use keepr_core::KeeprError;

use crate::database::Database;
use crate::queries::column_enum;

/// Result of an enqueue call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnqueueOutcome {
    pub id: i64,
    /// False when an existing non-terminal row with the same dedupe key
    /// was returned instead of inserting a new one.
    pub created: bool,
}

const SELECT_COLUMNS: &str = "id, vault_address, group_id, action_type, payload, dedupe_key,
     status, attempt_count, next_attempt_at, last_error, created_at, updated_at, executed_at";

fn row_to_action(row: &rusqlite::Row<'_>) -> rusqlite::Result<Action> {
    Ok(Action {
        id: row.get(0)?,
        vault_address: row.get(1)?,
        group_id: row.get(2)?,
        action_type: column_enum::<ActionType>(3, row.get(3)?)?,
        payload: row.get(4)?,
        dedupe_key: row.get(5)?,
        status: column_enum::<ActionStatus>(6, row.get(6)?)?,
        attempt_count: row.get(7)?,
        next_attempt_at: row.get(8)?,
        last_error: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        executed_at: row.get(12)?,
    })
}

/// Enqueue a new action, or return the existing non-terminal row that
/// already carries this dedupe key (idempotent enqueue).
///
/// Terminal rows (`executed`, `failed`) never block: once an action has
/// finished, the same logical action may be enqueued again as a new row.
pub async fn enqueue(
    db: &Database,
    vault_address: &str,
    group_id: &str,
    action_type: ActionType,
    payload: &ActionPayload,
    dedupe_key: &str,
) -> Result<EnqueueOutcome, KeeprError> {
    let vault_address = vault_address.to_string();
    let group_id = group_id.to_string();
    let dedupe_key = dedupe_key.to_string();
    let payload_json = serde_json::to_string(payload).map_err(|e| KeeprError::Storage {
        source: Box::new(e),
    })?;

    let outcome = db
        .connection()
        .call(move |conn| {
            // Check-then-insert is atomic here: all writes run on the one
            // background thread, and the partial unique index backstops
            // any other process sharing the file.
            let existing = conn.query_row(
                "SELECT id FROM actions
                 WHERE dedupe_key = ?1 AND status NOT IN ('executed', 'failed')
                 LIMIT 1",
                params![dedupe_key],
                |row| row.get::<_, i64>(0),
            );
            match existing {
                Ok(id) => Ok(EnqueueOutcome { id, created: false }),
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    conn.execute(
                        "INSERT INTO actions
                             (vault_address, group_id, action_type, payload, dedupe_key, status)
                         VALUES (?1, ?2, ?3, ?4, ?5, 'pending')",
                        params![
                            vault_address,
                            group_id,
                            action_type.to_string(),
                            payload_json,
                            dedupe_key,
                        ],
                    )?;
                    Ok(EnqueueOutcome {
                        id: conn.last_insert_rowid(),
                        created: true,
                    })
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    debug!(
        id = outcome.id,
        created = outcome.created,
        "action enqueued"
    );
    Ok(outcome)
}

/// Claim up to `limit` due actions, transitioning each to `executing`.
///
/// Rows are selected oldest-created-first from `pending`/`retry` whose
/// `next_attempt_at` is unset or due. The transition is a conditional
/// UPDATE per row: a row that changed state between select and update is
/// simply skipped, which is what makes concurrent claimers safe.
pub async fn claim_batch(db: &Database, limit: usize) -> Result<Vec<Action>, KeeprError> {
    let limit = limit as i64;
    db.connection()
        .call(move |conn| {
            let candidate_ids: Vec<i64> = {
                let mut stmt = conn.prepare(
                    "SELECT id FROM actions
                     WHERE status IN ('pending', 'retry')
                       AND (next_attempt_at IS NULL
                            OR next_attempt_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                     ORDER BY created_at ASC, id ASC
                     LIMIT ?1",
                )?;
                stmt.query_map(params![limit], |row| row.get(0))?
                    .collect::<Result<Vec<_>, _>>()?
            };

            let mut claimed = Vec::with_capacity(candidate_ids.len());
            for id in candidate_ids {
                let changed = conn.execute(
                    "UPDATE actions
                     SET status = 'executing',
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?1 AND status IN ('pending', 'retry')",
                    params![id],
                )?;
                if changed == 1 {
                    let action = conn.query_row(
                        &format!("SELECT {SELECT_COLUMNS} FROM actions WHERE id = ?1"),
                        params![id],
                        row_to_action,
                    )?;
                    claimed.push(action);
                }
            }
            Ok(claimed)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark an action as successfully executed (terminal).
pub async fn mark_executed(db: &Database, id: i64) -> Result<(), KeeprError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE actions
                 SET status = 'executed',
                     last_error = NULL,
                     executed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Schedule a retry: increments the attempt count and records the error
/// and the next due time.
pub async fn mark_retry(
    db: &Database,
    id: i64,
    error: &str,
    next_attempt_at: &str,
) -> Result<(), KeeprError> {
    let error = error.to_string();
    let next_attempt_at = next_attempt_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE actions
                 SET status = 'retry',
                     attempt_count = attempt_count + 1,
                     last_error = ?2,
                     next_attempt_at = ?3,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, error, next_attempt_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark an action as permanently failed (terminal).
pub async fn mark_failed(db: &Database, id: i64, error: &str) -> Result<(), KeeprError> {
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE actions
                 SET status = 'failed',
                     attempt_count = attempt_count + 1,
                     last_error = ?2,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, error],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Divert an action to `needs_user_setup`: a known precondition failure
/// (the wallet has no messaging identity) that only external user action
/// can clear. Not retried by this engine.
pub async fn mark_needs_user_setup(db: &Database, id: i64, error: &str) -> Result<(), KeeprError> {
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE actions
                 SET status = 'needs_user_setup',
                     attempt_count = attempt_count + 1,
                     last_error = ?2,
                     next_attempt_at = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, error],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Return rows stuck in `executing` older than `cutoff_iso` to `retry`.
///
/// Crash recovery: `executing` is not a resting state, so any row still
/// there after the cutoff belongs to a worker that died mid-flight. The
/// attempt count is left untouched -- the attempt never concluded.
pub async fn release_stuck(db: &Database, cutoff_iso: &str) -> Result<usize, KeeprError> {
    let cutoff = cutoff_iso.to_string();
    db.connection()
        .call(move |conn| {
            let released = conn.execute(
                "UPDATE actions
                 SET status = 'retry',
                     next_attempt_at = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE status = 'executing' AND updated_at <= ?1",
                params![cutoff],
            )?;
            Ok(released)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch a single action by id.
pub async fn get_action(db: &Database, id: i64) -> Result<Option<Action>, KeeprError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM actions WHERE id = ?1"),
                params![id],
                row_to_action,
            );
            match result {
                Ok(action) => Ok(Some(action)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count actions grouped by status.
pub async fn count_by_status(db: &Database) -> Result<Vec<(ActionStatus, i64)>, KeeprError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT status, COUNT(*) FROM actions GROUP BY status ORDER BY status",
            )?;
            let counts = stmt
                .query_map([], |row| {
                    let status = column_enum::<ActionStatus>(0, row.get(0)?)?;
                    Ok((status, row.get::<_, i64>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(counts)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time;
    use keepr_core::types::ActionPayload;
    use std::time::Duration;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("actions.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn payload(wallet: &str) -> ActionPayload {
        ActionPayload {
            kind: ActionType::AddMember,
            group_id: "g1".into(),
            wallet_address: wallet.into(),
            reason: "shares_eligible".into(),
            evidence: Vec::new(),
        }
    }

    async fn enqueue_one(db: &Database, key: &str) -> EnqueueOutcome {
        enqueue(db, "0xvault", "g1", ActionType::AddMember, &payload("0xw"), key)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn enqueue_is_idempotent_while_row_is_live() {
        let (db, _dir) = setup_db().await;

        let first = enqueue_one(&db, "join:add_member:0xvault:g1:0xw").await;
        assert!(first.created);

        let second = enqueue_one(&db, "join:add_member:0xvault:g1:0xw").await;
        assert!(!second.created);
        assert_eq!(second.id, first.id);

        let counts = count_by_status(&db).await.unwrap();
        assert_eq!(counts, vec![(ActionStatus::Pending, 1)]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn terminal_row_releases_the_dedupe_key() {
        let (db, _dir) = setup_db().await;
        let key = "join:add_member:0xvault:g1:0xw";

        let first = enqueue_one(&db, key).await;
        mark_failed(&db, first.id, "boom").await.unwrap();

        let second = enqueue_one(&db, key).await;
        assert!(second.created, "failed row must not block a new enqueue");
        assert_ne!(second.id, first.id);

        mark_executed(&db, second.id).await.unwrap();
        let third = enqueue_one(&db, key).await;
        assert!(third.created, "executed row must not block a new enqueue");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn needs_user_setup_still_holds_the_dedupe_key() {
        let (db, _dir) = setup_db().await;
        let key = "join:add_member:0xvault:g1:0xw";

        let first = enqueue_one(&db, key).await;
        mark_needs_user_setup(&db, first.id, "no identity").await.unwrap();

        // Not a terminal state: the same logical action stays deduped.
        let second = enqueue_one(&db, key).await;
        assert!(!second.created);
        assert_eq!(second.id, first.id);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_batch_takes_oldest_first_and_drains() {
        let (db, _dir) = setup_db().await;

        let a = enqueue_one(&db, "k1").await;
        let b = enqueue_one(&db, "k2").await;

        let claimed = claim_batch(&db, 10).await.unwrap();
        assert_eq!(
            claimed.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![a.id, b.id]
        );
        assert!(claimed.iter().all(|c| c.status == ActionStatus::Executing));

        // Everything is executing now; nothing left to claim.
        assert!(claim_batch(&db, 10).await.unwrap().is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_respects_next_attempt_at() {
        let (db, _dir) = setup_db().await;

        let a = enqueue_one(&db, "k1").await;
        let claimed = claim_batch(&db, 1).await.unwrap();
        assert_eq!(claimed.len(), 1);

        // Scheduled in the future: not due.
        let future = time::iso_after(Duration::from_secs(300));
        mark_retry(&db, a.id, "transient", &future).await.unwrap();
        assert!(claim_batch(&db, 10).await.unwrap().is_empty());

        // Backdate the schedule: due again.
        mark_retry(&db, a.id, "transient", "2020-01-01T00:00:00.000Z")
            .await
            .unwrap();
        let claimed = claim_batch(&db, 10).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].attempt_count, 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_claimers_get_exclusive_rows() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("race.db");
        let db = std::sync::Arc::new(Database::open(db_path.to_str().unwrap()).await.unwrap());

        enqueue(
            &db,
            "0xvault",
            "g1",
            ActionType::AddMember,
            &payload("0xw"),
            "only-row",
        )
        .await
        .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                claim_batch(&db, 1).await.unwrap().len()
            }));
        }

        let mut total = 0;
        for handle in handles {
            total += handle.await.unwrap();
        }
        assert_eq!(total, 1, "exactly one claimer may win the row");
    }

    #[tokio::test]
    async fn transient_retries_never_reach_failed() {
        let (db, _dir) = setup_db().await;
        let a = enqueue_one(&db, "k1").await;

        // Simulate an execution that always fails transiently.
        for attempt in 0..6u32 {
            let claimed = claim_batch(&db, 1).await.unwrap();
            assert_eq!(claimed.len(), 1, "attempt {attempt} should be claimable");
            // Immediately due again so the loop can continue.
            mark_retry(&db, a.id, "timeout", "2020-01-01T00:00:00.000Z")
                .await
                .unwrap();
        }

        let action = get_action(&db, a.id).await.unwrap().unwrap();
        assert_eq!(action.status, ActionStatus::Retry);
        assert_eq!(action.attempt_count, 6);
        assert_eq!(action.last_error.as_deref(), Some("timeout"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn release_stuck_returns_stale_executing_rows() {
        let (db, _dir) = setup_db().await;
        let a = enqueue_one(&db, "k1").await;
        let fresh = enqueue_one(&db, "k2").await;

        let claimed = claim_batch(&db, 10).await.unwrap();
        assert_eq!(claimed.len(), 2);

        // Backdate one row's updated_at to simulate a crashed worker.
        let stale_id = a.id;
        db.connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE actions SET updated_at = '2020-01-01T00:00:00.000Z' WHERE id = ?1",
                    params![stale_id],
                )?;
                Ok::<_, rusqlite::Error>(())
            })
            .await
            .unwrap();

        // A cutoff between the backdate and now releases only the stale row.
        let released = release_stuck(&db, "2021-01-01T00:00:00.000Z").await.unwrap();
        assert_eq!(released, 1);

        let stale = get_action(&db, a.id).await.unwrap().unwrap();
        assert_eq!(stale.status, ActionStatus::Retry);
        // The in-flight attempt never concluded; the count is unchanged.
        assert_eq!(stale.attempt_count, 0);

        let still_running = get_action(&db, fresh.id).await.unwrap().unwrap();
        assert_eq!(still_running.status, ActionStatus::Executing);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn executed_rows_record_completion() {
        let (db, _dir) = setup_db().await;
        let a = enqueue_one(&db, "k1").await;

        claim_batch(&db, 1).await.unwrap();
        mark_executed(&db, a.id).await.unwrap();

        let action = get_action(&db, a.id).await.unwrap().unwrap();
        assert_eq!(action.status, ActionStatus::Executed);
        assert!(action.executed_at.is_some());
        assert!(action.last_error.is_none());

        db.close().await.unwrap();
    }
}
