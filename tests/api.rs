mod common;

use std::sync::Arc;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;
use common::{context, test_config, Behavior, FakeSource};
use market_indices::api::{create_router, ApiState};
use market_indices::api::rest::{LIVENESS_TEXT, UPDATE_MESSAGE};
use market_indices::storage::MemorySnapshotStore;
use market_indices::types::snapshot::IndexSnapshot;

fn app(source: Arc<FakeSource>, store: Arc<MemorySnapshotStore>) -> Router {
    let ctx = context(&test_config(), &[("Dow Jones", "^DJI"), ("NASDAQ", "^IXIC")], source, store);
    create_router(Arc::new(ApiState::from_context(&ctx)), true)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn home_reports_liveness() {
    let (status, body) = get(app(Arc::new(FakeSource::new()), Arc::new(MemorySnapshotStore::new())), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), LIVENESS_TEXT);
}

#[tokio::test]
async fn market_indices_serves_stored_snapshots_with_nulls() {
    let store = Arc::new(MemorySnapshotStore::with_documents([
        ("NASDAQ".to_string(), IndexSnapshot::absent()),
    ]));

    let (status, body) = get_json(app(Arc::new(FakeSource::new()), store), "/market-indices").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["NASDAQ"]["current_price"], Value::Null);
    assert_eq!(body["NASDAQ"]["last_updated"], Value::Null);
}

#[tokio::test]
async fn market_indices_store_failure_is_a_500() {
    let store = Arc::new(MemorySnapshotStore::new());
    store.set_unavailable(true);

    let (status, body) = get_json(app(Arc::new(FakeSource::new()), store), "/market-indices").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Store read failed"));
}

#[tokio::test]
async fn update_reports_partial_failure_inside_data() {
    let source = Arc::new(
        FakeSource::new()
            .with("^DJI", Behavior::Closes(vec![100.0, 105.0]))
            .with("^IXIC", Behavior::Unavailable)
    );
    let store = Arc::new(MemorySnapshotStore::new());
    let router = app(source, store.clone());

    let (status, body) = get_json(router.clone(), "/update-market-indices").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], UPDATE_MESSAGE);
    assert_eq!(body["data"]["Dow Jones"]["current_price"], 105.0);
    assert_eq!(body["data"]["Dow Jones"]["previous_close"], 100.0);
    assert_eq!(body["data"]["Dow Jones"]["percent_change"], 5.0);
    assert_eq!(body["data"]["Dow Jones"]["status"], "updated");
    assert_eq!(body["data"]["NASDAQ"]["current_price"], Value::Null);
    assert_eq!(body["data"]["NASDAQ"]["status"], "initialized");
    assert!(body["data"]["NASDAQ"]["error"].is_string());

    // The read path sees what the refresh wrote
    let (status, body) = get_json(router, "/market-indices").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Dow Jones"]["current_price"], 105.0);
    assert_eq!(body["Dow Jones"]["last_updated"], "2024-03-05T14:30:00Z");
}

#[tokio::test]
async fn update_fails_when_no_index_reaches_the_store() {
    let source = Arc::new(
        FakeSource::new()
            .with("^DJI", Behavior::Closes(vec![100.0, 105.0]))
            .with("^IXIC", Behavior::Closes(vec![200.0, 210.0]))
    );
    let store = Arc::new(MemorySnapshotStore::new());
    store.set_unavailable(true);

    let (status, body) = get_json(app(source, store.clone()), "/update-market-indices").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Store unreachable"));
    assert!(body.get("message").is_none());
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn update_with_one_failed_write_still_succeeds() {
    let source = Arc::new(
        FakeSource::new()
            .with("^DJI", Behavior::Closes(vec![100.0, 105.0]))
            .with("^IXIC", Behavior::Closes(vec![200.0, 210.0]))
    );
    let store = Arc::new(MemorySnapshotStore::new());
    store.fail_writes_for("Dow Jones");

    let (status, body) = get_json(app(source, store.clone()), "/update-market-indices").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], UPDATE_MESSAGE);
    assert_eq!(body["data"]["Dow Jones"]["status"], "write_failed");
    assert!(body["data"]["Dow Jones"]["error"].is_string());
    assert_eq!(body["data"]["NASDAQ"]["status"], "updated");
    assert_eq!(store.document("NASDAQ").unwrap().current_price.unwrap().to_f64(), 210.0);
}

#[tokio::test]
async fn metrics_are_exposed_as_text() {
    market_indices::observability::metrics::register_metrics().unwrap();
    let (status, body) = get(app(Arc::new(FakeSource::new()), Arc::new(MemorySnapshotStore::new())), "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("refresh_ticks_dropped_total"));
}
