// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end pipeline tests against in-process fakes: a join request is
//! watched, decided by the quorum oracle, enqueued, and executed; and a
//! member who falls below the threshold is swept out by reconciliation.

use std::sync::Arc;
use std::time::Duration;

use keepr_chain::Oracle;
use keepr_config::EngineConfig;
use keepr_core::types::{ActionStatus, JoinRequestStatus};
use keepr_engine::EngineLoop;
use keepr_storage::queries::{actions, join_requests, vaults};
use keepr_storage::Database;
use keepr_test_utils::{test_vault, FakeShareReader, MockGroupClient};

struct World {
    db: Arc<Database>,
    reader: Arc<FakeShareReader>,
    groups: Arc<MockGroupClient>,
    engine: EngineLoop,
    _dir: tempfile::TempDir,
}

async fn world() -> World {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("keepr-e2e.db");
    let db = Arc::new(Database::open(db_path.to_str().unwrap()).await.unwrap());
    vaults::upsert_vault(&db, &test_vault("g1", true)).await.unwrap();

    let reader = Arc::new(FakeShareReader::default());
    let oracle = Arc::new(Oracle::new(
        reader.clone(),
        vec!["https://rpc-a.example".into(), "https://rpc-b.example".into()],
    ));
    let groups = Arc::new(MockGroupClient::default());
    let config = EngineConfig {
        member_pacing_ms: 0,
        ..EngineConfig::default()
    };
    let engine = EngineLoop::new(db.clone(), oracle, groups.clone(), config);
    World {
        db,
        reader,
        groups,
        engine,
        _dir: dir,
    }
}

#[tokio::test]
async fn join_flows_from_watch_to_membership() {
    let w = world().await;
    w.reader.set_balance("0xalice", 250);
    w.groups.register_wallet("0xalice", "alice-inbox");
    let request_id = join_requests::insert_watch(&w.db, "0xvault", "g1", "0xalice")
        .await
        .unwrap();

    // Tick 1 decides the join and enqueues, tick 2 executes the action.
    w.engine.tick().await;
    w.engine.tick().await;

    assert!(w.groups.is_member("g1", "alice-inbox"));

    let request = join_requests::get_request(&w.db, request_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(request.status, JoinRequestStatus::Queued);
    let action = actions::get_action(&w.db, request.action_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(action.status, ActionStatus::Executed);
    let payload = action.parse_payload().unwrap();
    assert_eq!(payload.reason, "shares_eligible");
    // Evidence from both quorum checks rode along into the action.
    assert_eq!(payload.evidence.len(), 2);
    assert_ne!(payload.evidence[0].rpc_url, payload.evidence[1].rpc_url);
}

#[tokio::test]
async fn outage_defers_the_join_until_the_chain_recovers() {
    let w = world().await;
    w.reader.set_balance("0xbob", 250);
    w.groups.register_wallet("0xbob", "bob-inbox");
    w.reader.fail_endpoint("https://rpc-a.example");
    w.reader.fail_endpoint("https://rpc-b.example");
    let request_id = join_requests::insert_watch(&w.db, "0xvault", "g1", "0xbob")
        .await
        .unwrap();

    // Fail-closed vault plus total outage: nobody gets in.
    w.engine.tick().await;
    let request = join_requests::get_request(&w.db, request_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(request.status, JoinRequestStatus::Watching);
    assert_eq!(request.last_reason.as_deref(), Some("verification_failed"));
    assert!(!w.groups.is_member("g1", "bob-inbox"));

    // Chain recovers; the watch is rescheduled ~120s out, so force it due
    // rather than waiting.
    w.reader.restore_endpoint("https://rpc-a.example");
    w.reader.restore_endpoint("https://rpc-b.example");
    join_requests::reschedule(&w.db, request_id, "retest", "2020-01-01T00:00:00.000Z")
        .await
        .unwrap();

    w.engine.tick().await;
    w.engine.tick().await;
    assert!(w.groups.is_member("g1", "bob-inbox"));
}

#[tokio::test]
async fn sold_out_member_is_swept_and_removed() {
    let w = world().await;
    w.groups.seed_member("g1", "owner-inbox", Some("0xowner"));
    w.groups.register_wallet("0xcarol", "carol-inbox");
    w.groups.seed_member("g1", "carol-inbox", Some("0xcarol"));
    w.reader.set_balance("0xcarol", 5);

    // Tick 1: reconciliation confirms ineligibility twice and enqueues the
    // removal. Tick 2: the executor removes the member.
    w.engine.tick().await;
    w.engine.tick().await;

    assert!(!w.groups.is_member("g1", "carol-inbox"));
    // The canonical owner is untouched no matter their balance.
    assert!(w.groups.is_member("g1", "owner-inbox"));

    // A third tick must not enqueue a duplicate removal: the group was
    // synced moments ago, and the member is gone anyway.
    w.engine.tick().await;
    let counts = actions::count_by_status(&w.db).await.unwrap();
    assert_eq!(counts, vec![(ActionStatus::Executed, 1)]);
}

#[tokio::test]
async fn wallet_without_identity_parks_as_needs_user_setup() {
    let w = world().await;
    w.reader.set_balance("0xdave", 250);
    // 0xdave never registered a messaging identity.
    let request_id = join_requests::insert_watch(&w.db, "0xvault", "g1", "0xdave")
        .await
        .unwrap();

    w.engine.tick().await;
    w.engine.tick().await;

    let request = join_requests::get_request(&w.db, request_id)
        .await
        .unwrap()
        .unwrap();
    let action = actions::get_action(&w.db, request.action_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(action.status, ActionStatus::NeedsUserSetup);

    // Many more ticks change nothing: the row waits for the user, not us.
    w.engine.tick().await;
    let action = actions::get_action(&w.db, action.id).await.unwrap().unwrap();
    assert_eq!(action.status, ActionStatus::NeedsUserSetup);
    assert_eq!(action.attempt_count, 1);
}

#[tokio::test]
async fn transient_gateway_failure_retries_with_backoff() {
    let w = world().await;
    w.reader.set_balance("0xeve", 250);
    w.groups.register_wallet("0xeve", "eve-inbox");
    let request_id = join_requests::insert_watch(&w.db, "0xvault", "g1", "0xeve")
        .await
        .unwrap();

    w.engine.tick().await; // decide + enqueue
    w.groups
        .fail_next_add(keepr_core::MessagingErrorKind::RateLimited);
    w.engine.tick().await; // execution fails transiently

    let action_id = join_requests::get_request(&w.db, request_id)
        .await
        .unwrap()
        .unwrap()
        .action_id
        .unwrap();
    let action = actions::get_action(&w.db, action_id).await.unwrap().unwrap();
    assert_eq!(action.status, ActionStatus::Retry);
    assert_eq!(action.attempt_count, 1);
    assert!(action.next_attempt_at.is_some());

    // The retry is scheduled in the future; further ticks leave it parked
    // until its delay elapses.
    w.engine.tick().await;
    assert!(!w.groups.is_member("g1", "eve-inbox"));

    // Backdate the schedule to simulate the delay elapsing.
    actions::mark_retry(&w.db, action_id, "rate_limited", "2020-01-01T00:00:00.000Z")
        .await
        .unwrap();

    w.engine.tick().await;
    assert!(w.groups.is_member("g1", "eve-inbox"));
}
