//! Integration tests for the pool lifecycle state machine and the
//! authenticated bulk controls

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};

use trellis_authentication::AdminAction;
use trellis_core::model::{AllocationKind, EligibilityRule, PoolMode, PoolStatus};
use trellis_core::types::{CollectionId, WalletId};
use trellis_core::TrellisError;
use trellis_engine::{Engine, NewPool};
use trellis_store::{MemoryStore, VestingStore};
use trellis_testkit::{
    admin_signing_key, signed_admin_envelope, test_config, MockEscrowProvider, MockHolderIndex,
    MockLedgerBalance,
};

fn build_engine(
    index: MockHolderIndex,
    escrow: MockEscrowProvider,
) -> (Engine, Arc<MemoryStore>, Arc<MockEscrowProvider>) {
    trellis_testkit::init_tracing();
    let store = Arc::new(MemoryStore::new());
    let escrow = Arc::new(escrow);
    let engine = Engine::new(
        store.clone(),
        Arc::new(index),
        escrow.clone(),
        Arc::new(MockLedgerBalance::new()),
        &test_config(),
    )
    .unwrap();
    (engine, store, escrow)
}

fn new_pool(mode: PoolMode, rules: Vec<EligibilityRule>) -> NewPool {
    let now = Utc::now();
    NewPool {
        name: "campaign".into(),
        total_size: 1_000_000.0,
        start_time: now,
        end_time: now + Duration::days(90),
        cliff_seconds: 86_400,
        mode,
        rules,
    }
}

fn percentage_rule(collection: &str, pct: f64) -> EligibilityRule {
    EligibilityRule::new(
        CollectionId::new(collection),
        1,
        AllocationKind::Percentage(pct),
    )
}

#[tokio::test]
async fn pause_resume_round_trip() {
    let (engine, _store, _) = build_engine(MockHolderIndex::new(), MockEscrowProvider::new());
    let pool = engine
        .lifecycle
        .create_pool(new_pool(PoolMode::Dynamic, vec![]))
        .await
        .unwrap();

    let paused = engine.lifecycle.pause(pool.id).await.unwrap();
    assert_eq!(paused.status, PoolStatus::Paused);

    // pausing a paused pool is a guard violation, not a no-op
    assert_matches!(
        engine.lifecycle.pause(pool.id).await,
        Err(TrellisError::Precondition { .. })
    );

    let resumed = engine.lifecycle.resume(pool.id).await.unwrap();
    assert_eq!(resumed.status, PoolStatus::Active);
}

#[tokio::test]
async fn cancellation_revokes_memberships_and_is_terminal() {
    let collection = CollectionId::new("col-a");
    let index = MockHolderIndex::new().with_holders(&collection, &[("w1", 2), ("w2", 3)]);
    let (engine, store, _) = build_engine(index, MockEscrowProvider::new());

    let pool = engine
        .lifecycle
        .create_pool(new_pool(
            PoolMode::Dynamic,
            vec![percentage_rule("col-a", 1.0)],
        ))
        .await
        .unwrap();
    engine.reconciler.sync_pool(pool.id).await.unwrap();

    let cancelled = engine
        .lifecycle
        .cancel(pool.id, "campaign wound down")
        .await
        .unwrap();
    assert_eq!(cancelled.status, PoolStatus::Cancelled);
    assert_eq!(
        cancelled.cancelled.as_ref().unwrap().reason,
        "campaign wound down"
    );

    let memberships = store.memberships_for_pool(pool.id).await.unwrap();
    assert_eq!(memberships.len(), 2);
    for m in &memberships {
        assert!(!m.is_active);
        assert!(m.is_cancelled);
        assert_eq!(m.cancelled.as_ref().unwrap().reason, "campaign wound down");
    }

    // terminal: no resume, no second cancel
    assert_matches!(
        engine.lifecycle.resume(pool.id).await,
        Err(TrellisError::Precondition { .. })
    );
    assert_matches!(
        engine.lifecycle.cancel(pool.id, "again").await,
        Err(TrellisError::Precondition { .. })
    );
}

#[tokio::test]
async fn locked_snapshot_pool_refuses_cancellation() {
    let collection = CollectionId::new("col-a");
    let index = MockHolderIndex::new().with_holders(&collection, &[("w1", 1), ("w2", 1)]);
    let (engine, store, _) = build_engine(index, MockEscrowProvider::new());

    let pool = engine
        .lifecycle
        .create_pool(new_pool(
            PoolMode::Snapshot,
            vec![percentage_rule("col-a", 10.0)],
        ))
        .await
        .unwrap();
    let report = engine.lifecycle.commit_snapshot(pool.id).await.unwrap();
    assert_eq!(report.succeeded.len(), 2);

    let before = store.memberships_for_pool(pool.id).await.unwrap();
    assert!(before.iter().all(|m| m.snapshot_locked));

    assert_matches!(
        engine.lifecycle.cancel(pool.id, "try").await,
        Err(TrellisError::Precondition { .. })
    );

    // nothing changed as a result of the refused transition
    let after = store.memberships_for_pool(pool.id).await.unwrap();
    assert_eq!(before, after);
    let pool = store.get_pool(pool.id).await.unwrap().unwrap();
    assert_eq!(pool.status, PoolStatus::Active);
}

#[tokio::test]
async fn snapshot_commits_exactly_once() {
    let collection = CollectionId::new("col-a");
    let index = MockHolderIndex::new().with_holders(&collection, &[("w1", 1)]);
    let (engine, store, _) = build_engine(index, MockEscrowProvider::new());

    let pool = engine
        .lifecycle
        .create_pool(new_pool(
            PoolMode::Snapshot,
            vec![percentage_rule("col-a", 5.0)],
        ))
        .await
        .unwrap();

    // preview writes nothing
    let preview = engine.lifecycle.preview_snapshot(pool.id).await.unwrap();
    assert_eq!(preview.allocations.len(), 1);
    assert!(store.memberships_for_pool(pool.id).await.unwrap().is_empty());

    engine.lifecycle.commit_snapshot(pool.id).await.unwrap();
    assert!(store.get_pool(pool.id).await.unwrap().unwrap().snapshot_taken);

    let err = engine.lifecycle.commit_snapshot(pool.id).await.unwrap_err();
    assert_eq!(err.code(), "precondition_failed");
}

#[tokio::test]
async fn rules_mutate_only_while_dynamic() {
    let (engine, _store, _) = build_engine(MockHolderIndex::new(), MockEscrowProvider::new());

    let snapshot = engine
        .lifecycle
        .create_pool(new_pool(
            PoolMode::Snapshot,
            vec![percentage_rule("col-a", 5.0)],
        ))
        .await
        .unwrap();
    assert_matches!(
        engine
            .lifecycle
            .add_rule(snapshot.id, percentage_rule("col-b", 1.0))
            .await,
        Err(TrellisError::Precondition { .. })
    );

    let dynamic = engine
        .lifecycle
        .create_pool(new_pool(PoolMode::Dynamic, vec![]))
        .await
        .unwrap();
    let updated = engine
        .lifecycle
        .add_rule(dynamic.id, percentage_rule("col-b", 1.0))
        .await
        .unwrap();
    assert_eq!(updated.rules.len(), 1);

    let rule_id = updated.rules[0].id;
    let toggled = engine
        .lifecycle
        .set_rule_enabled(dynamic.id, rule_id, false)
        .await
        .unwrap();
    assert!(!toggled.rules[0].enabled);
}

#[tokio::test]
async fn manual_pools_take_direct_entries_only() {
    let (engine, _store, _) = build_engine(MockHolderIndex::new(), MockEscrowProvider::new());

    let manual = engine
        .lifecycle
        .create_pool(new_pool(PoolMode::Manual, vec![]))
        .await
        .unwrap();
    let membership = engine
        .lifecycle
        .add_manual_allocation(manual.id, WalletId::new("w1"), 2_500.0, 4)
        .await
        .unwrap();
    assert_eq!(membership.amount, 2_500.0);
    assert_eq!(membership.share_pct, 0.25);

    // the same wallet cannot be allocated twice
    assert_matches!(
        engine
            .lifecycle
            .add_manual_allocation(manual.id, WalletId::new("w1"), 100.0, 1)
            .await,
        Err(TrellisError::Precondition { .. })
    );

    // direct entry is rejected outside manual mode
    let dynamic = engine
        .lifecycle
        .create_pool(new_pool(PoolMode::Dynamic, vec![]))
        .await
        .unwrap();
    assert_matches!(
        engine
            .lifecycle
            .add_manual_allocation(dynamic.id, WalletId::new("w1"), 100.0, 1)
            .await,
        Err(TrellisError::Precondition { .. })
    );
}

#[tokio::test]
async fn failing_escrow_never_blocks_cancellation() {
    let collection = CollectionId::new("col-a");
    let index = MockHolderIndex::new().with_holders(&collection, &[("w1", 1)]);
    let (engine, store, escrow) = build_engine(index, MockEscrowProvider::new().failing_cancel());

    let pool = engine
        .lifecycle
        .create_pool(new_pool(
            PoolMode::Dynamic,
            vec![percentage_rule("col-a", 1.0)],
        ))
        .await
        .unwrap();
    engine.lifecycle.deploy_escrow(pool.id).await.unwrap();
    engine.reconciler.sync_pool(pool.id).await.unwrap();

    let cancelled = engine.lifecycle.cancel(pool.id, "shut down").await.unwrap();
    assert_eq!(cancelled.status, PoolStatus::Cancelled);
    assert!(escrow.cancelled().is_empty());

    let memberships = store.memberships_for_pool(pool.id).await.unwrap();
    assert!(memberships.iter().all(|m| m.is_cancelled));
}

#[tokio::test]
async fn escrow_deploys_at_most_once() {
    let (engine, _store, escrow) = build_engine(MockHolderIndex::new(), MockEscrowProvider::new());
    let pool = engine
        .lifecycle
        .create_pool(new_pool(PoolMode::Manual, vec![]))
        .await
        .unwrap();

    let deployed = engine.lifecycle.deploy_escrow(pool.id).await.unwrap();
    assert!(deployed.escrow.is_some());
    assert_eq!(escrow.deployed().len(), 1);

    assert_matches!(
        engine.lifecycle.deploy_escrow(pool.id).await,
        Err(TrellisError::Precondition { .. })
    );
}

#[tokio::test]
async fn bulk_pause_and_resume_report_per_pool() {
    let (engine, store, _) = build_engine(MockHolderIndex::new(), MockEscrowProvider::new());
    let a = engine
        .lifecycle
        .create_pool(new_pool(PoolMode::Dynamic, vec![]))
        .await
        .unwrap();
    let b = engine
        .lifecycle
        .create_pool(new_pool(PoolMode::Manual, vec![]))
        .await
        .unwrap();
    engine.lifecycle.pause(b.id).await.unwrap();

    let key = admin_signing_key();
    let now = Utc::now();
    let report = engine
        .bulk
        .execute(&signed_admin_envelope(&key, AdminAction::PauseAll, now), now)
        .await
        .unwrap();
    assert_eq!(report.applied, vec![a.id]);
    assert_eq!(report.skipped, vec![b.id]);
    assert!(report.failed.is_empty());

    let report = engine
        .bulk
        .execute(
            &signed_admin_envelope(&key, AdminAction::ResumeAll, now),
            now,
        )
        .await
        .unwrap();
    assert_eq!(report.applied.len(), 2);

    for pool in store.list_pools().await.unwrap() {
        assert_eq!(pool.status, PoolStatus::Active);
    }
}

#[tokio::test]
async fn stale_bulk_command_is_rejected_before_any_transition() {
    let (engine, store, _) = build_engine(MockHolderIndex::new(), MockEscrowProvider::new());
    let pool = engine
        .lifecycle
        .create_pool(new_pool(PoolMode::Dynamic, vec![]))
        .await
        .unwrap();

    let key = admin_signing_key();
    let now = Utc::now();
    let stale = signed_admin_envelope(&key, AdminAction::PauseAll, now - Duration::seconds(301));
    assert_matches!(
        engine.bulk.execute(&stale, now).await,
        Err(TrellisError::Expired { .. })
    );

    let pool = store.get_pool(pool.id).await.unwrap().unwrap();
    assert_eq!(pool.status, PoolStatus::Active);
}

#[tokio::test]
async fn emergency_stop_reports_guarded_pools_as_failures() {
    let collection = CollectionId::new("col-a");
    let index = MockHolderIndex::new().with_holders(&collection, &[("w1", 1)]);
    let (engine, store, _) = build_engine(index, MockEscrowProvider::new());

    let locked = engine
        .lifecycle
        .create_pool(new_pool(
            PoolMode::Snapshot,
            vec![percentage_rule("col-a", 10.0)],
        ))
        .await
        .unwrap();
    engine.lifecycle.commit_snapshot(locked.id).await.unwrap();
    let open = engine
        .lifecycle
        .create_pool(new_pool(PoolMode::Dynamic, vec![]))
        .await
        .unwrap();

    let key = admin_signing_key();
    let now = Utc::now();
    let report = engine
        .bulk
        .execute(
            &signed_admin_envelope(&key, AdminAction::EmergencyStop, now),
            now,
        )
        .await
        .unwrap();

    assert_eq!(report.applied, vec![open.id]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].pool_id, locked.id);

    assert_eq!(
        store.get_pool(locked.id).await.unwrap().unwrap().status,
        PoolStatus::Active
    );
    assert_eq!(
        store.get_pool(open.id).await.unwrap().unwrap().status,
        PoolStatus::Cancelled
    );
}

#[tokio::test]
async fn every_transition_lands_in_the_audit_log() {
    let (engine, store, _) = build_engine(MockHolderIndex::new(), MockEscrowProvider::new());
    let pool = engine
        .lifecycle
        .create_pool(new_pool(PoolMode::Dynamic, vec![]))
        .await
        .unwrap();
    engine.lifecycle.pause(pool.id).await.unwrap();
    engine.lifecycle.resume(pool.id).await.unwrap();
    engine.lifecycle.cancel(pool.id, "done").await.unwrap();

    let actions: Vec<String> = store
        .list_audit()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(
        actions,
        vec![
            "pool_created",
            "pool_paused",
            "pool_resumed",
            "pool_cancelled"
        ]
    );
}

#[tokio::test]
async fn creation_validation_rejects_bad_input() {
    let (engine, _store, _) = build_engine(MockHolderIndex::new(), MockEscrowProvider::new());
    let now = Utc::now();

    let mut bad_window = new_pool(PoolMode::Manual, vec![]);
    bad_window.end_time = now - Duration::days(1);
    assert_matches!(
        engine.lifecycle.create_pool(bad_window).await,
        Err(TrellisError::Validation { .. })
    );

    let mut bad_size = new_pool(PoolMode::Manual, vec![]);
    bad_size.total_size = 0.0;
    assert_matches!(
        engine.lifecycle.create_pool(bad_size).await,
        Err(TrellisError::Validation { .. })
    );

    let bad_rule = new_pool(
        PoolMode::Dynamic,
        vec![percentage_rule("col-a", 150.0)],
    );
    assert_matches!(
        engine.lifecycle.create_pool(bad_rule).await,
        Err(TrellisError::Validation { .. })
    );
}
