mod common;

use std::sync::Arc;
use common::{context, cycle_start, test_config, Behavior, FakeSource};
use market_indices::refresh::{OutcomeStatus, Trigger};
use market_indices::storage::MemorySnapshotStore;
use market_indices::types::percent::Percent;
use market_indices::types::price::Price;
use market_indices::types::snapshot::IndexSnapshot;

#[tokio::test]
async fn two_closes_become_a_stored_snapshot() {
    let source = Arc::new(FakeSource::new().with("^A", Behavior::Closes(vec![100.00, 105.00])));
    let store = Arc::new(MemorySnapshotStore::new());
    let ctx = context(&test_config(), &[("A", "^A")], source, store.clone());

    let result = ctx.orchestrator.run_cycle(Trigger::Manual).await;

    let expected = IndexSnapshot::quoted(
        Price::from_f64(105.00),
        Price::from_f64(100.00),
        Percent::from_f64(5.00),
        cycle_start(),
    );
    assert_eq!(store.document("A"), Some(expected.clone()));
    assert_eq!(result.get("A").unwrap().snapshot, expected);
    assert_eq!(result.get("A").unwrap().status, OutcomeStatus::Updated);
}

#[tokio::test]
async fn first_run_without_data_writes_the_absent_document() {
    let source = Arc::new(FakeSource::new().with("^A", Behavior::Empty));
    let store = Arc::new(MemorySnapshotStore::new());
    let ctx = context(&test_config(), &[("A", "^A")], source.clone(), store.clone());

    let result = ctx.orchestrator.run_cycle(Trigger::Manual).await;

    assert_eq!(source.calls(), 3);
    assert_eq!(store.document("A"), Some(IndexSnapshot::absent()));
    assert_eq!(result.get("A").unwrap().status, OutcomeStatus::Initialized);
}

#[tokio::test]
async fn failed_fetch_keeps_the_previous_good_snapshot() {
    let source = Arc::new(FakeSource::new().with("^A", Behavior::Closes(vec![100.0, 105.0])));
    let store = Arc::new(MemorySnapshotStore::new());
    let ctx = context(&test_config(), &[("A", "^A")], source.clone(), store.clone());

    ctx.orchestrator.run_cycle(Trigger::Scheduled).await;
    let good = store.document("A").unwrap();
    assert!(good.has_quote());

    source.set("^A", Behavior::Unavailable);
    let result = ctx.orchestrator.run_cycle(Trigger::Scheduled).await;

    assert_eq!(store.document("A"), Some(good));
    assert_eq!(result.get("A").unwrap().status, OutcomeStatus::Preserved);
    assert!(result.get("A").unwrap().snapshot.is_absent());
}

#[tokio::test]
async fn short_series_keeps_the_previous_good_snapshot() {
    let source = Arc::new(FakeSource::new().with("^A", Behavior::Closes(vec![100.0, 105.0])));
    let store = Arc::new(MemorySnapshotStore::new());
    let ctx = context(&test_config(), &[("A", "^A")], source.clone(), store.clone());

    ctx.orchestrator.run_cycle(Trigger::Scheduled).await;
    let good = store.document("A").unwrap();

    source.set("^A", Behavior::Closes(vec![107.0]));
    ctx.orchestrator.run_cycle(Trigger::Scheduled).await;

    assert_eq!(store.document("A"), Some(good));
}

#[tokio::test]
async fn one_failing_index_does_not_block_the_others() {
    let source = Arc::new(
        FakeSource::new()
            .with("^A", Behavior::Unavailable)
            .with("^B", Behavior::Closes(vec![200.0, 190.0]))
            .with("^C", Behavior::Missing)
    );
    let store = Arc::new(MemorySnapshotStore::new());
    let ctx = context(&test_config(), &[("A", "^A"), ("B", "^B"), ("C", "^C")], source, store.clone());

    let result = ctx.orchestrator.run_cycle(Trigger::Manual).await;

    let b = store.document("B").unwrap();
    assert_eq!(b.current_price, Some(Price::from_f64(190.0)));
    assert_eq!(b.percent_change, Some(Percent::from_f64(-5.0)));
    assert_eq!(result.get("A").unwrap().status, OutcomeStatus::Initialized);
    assert_eq!(result.get("C").unwrap().status, OutcomeStatus::Initialized);
    assert_eq!(result.updated_count(), 1);
}

#[tokio::test]
async fn unchanged_upstream_gives_byte_identical_documents() {
    let source = Arc::new(
        FakeSource::new()
            .with("^A", Behavior::Closes(vec![38996.394531, 39087.378906]))
            .with("^B", Behavior::Closes(vec![0.0, 12.34]))
    );
    let store = Arc::new(MemorySnapshotStore::new());
    let ctx = context(&test_config(), &[("A", "^A"), ("B", "^B")], source, store.clone());

    ctx.orchestrator.run_cycle(Trigger::Scheduled).await;
    let first_a = serde_json::to_vec(&store.document("A").unwrap()).unwrap();
    let first_b = serde_json::to_vec(&store.document("B").unwrap()).unwrap();

    ctx.orchestrator.run_cycle(Trigger::Scheduled).await;
    let second_a = serde_json::to_vec(&store.document("A").unwrap()).unwrap();
    let second_b = serde_json::to_vec(&store.document("B").unwrap()).unwrap();

    assert_eq!(first_a, second_a);
    assert_eq!(first_b, second_b);
}

#[tokio::test]
async fn zero_previous_close_is_stored_with_zero_change() {
    let source = Arc::new(FakeSource::new().with("^Z", Behavior::Closes(vec![0.0, 3.5])));
    let store = Arc::new(MemorySnapshotStore::new());
    let ctx = context(&test_config(), &[("Z", "^Z")], source, store.clone());

    ctx.orchestrator.run_cycle(Trigger::Manual).await;

    let stored = store.document("Z").unwrap();
    assert_eq!(stored.percent_change, Some(Percent::zero()));
    assert_eq!(stored.current_price, Some(Price::from_f64(3.5)));
}

#[tokio::test]
async fn write_failure_heals_on_the_next_cycle() {
    let source = Arc::new(FakeSource::new().with("^A", Behavior::Closes(vec![1.0, 2.0])));
    let store = Arc::new(MemorySnapshotStore::new());
    let ctx = context(&test_config(), &[("A", "^A")], source, store.clone());

    store.fail_writes_for("A");
    let result = ctx.orchestrator.run_cycle(Trigger::Scheduled).await;
    assert_eq!(result.get("A").unwrap().status, OutcomeStatus::WriteFailed);
    assert!(store.document("A").is_none());

    store.clear_failures();
    ctx.orchestrator.run_cycle(Trigger::Scheduled).await;
    assert!(store.document("A").unwrap().has_quote());
}
