//! Counter administration endpoints and busy-counter policies.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{TestConfig, TestFixture};
use queuedesk_core::BusyCounterPolicy;

#[tokio::test]
async fn test_create_counter_applies_defaults() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post("/api/v1/counter/", json!({ "name": "Teller A" }))
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], true);

    let counter = &response.body["data"]["counter"];
    assert_eq!(counter["name"], "Teller A");
    assert_eq!(counter["isActive"], true);
    assert_eq!(counter["estimatedServiceTime"], 5);
    assert_eq!(counter["maxQueue"], 100);
    assert!(counter["currentQueueNumber"].is_null());
}

#[tokio::test]
async fn test_create_counter_rejects_blank_name() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post("/api/v1/counter/", json!({ "name": "   " }))
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["status"], false);
}

#[tokio::test]
async fn test_list_and_get_counters() {
    let fixture = TestFixture::new().await;
    let first = fixture.create_counter("One").await;
    let second = fixture.create_counter("Two").await;

    let list = fixture.get("/api/v1/counter/").await;
    assert_status!(list, StatusCode::OK);
    let counters = list.body["data"]["counters"].as_array().unwrap();
    assert_eq!(counters.len(), 2);
    assert_eq!(counters[0]["id"], first);
    assert_eq!(counters[1]["id"], second);

    let single = fixture.get(&format!("/api/v1/counter/{}", second)).await;
    assert_eq!(single.body["data"]["counter"]["name"], "Two");

    let missing = fixture.get("/api/v1/counter/404").await;
    assert_status!(missing, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_counter_partial() {
    let fixture = TestFixture::new().await;
    let id = fixture.create_counter("Old name").await;

    let response = fixture
        .put(
            &format!("/api/v1/counter/{}", id),
            json!({ "name": "New name", "estimatedServiceTime": 12 }),
        )
        .await;
    assert_status!(response, StatusCode::OK);
    let counter = &response.body["data"]["counter"];
    assert_eq!(counter["name"], "New name");
    assert_eq!(counter["estimatedServiceTime"], 12);
    assert_eq!(counter["maxQueue"], 100);
}

#[tokio::test]
async fn test_delete_counter_hides_it() {
    let fixture = TestFixture::new().await;
    let id = fixture.create_counter("Temporary").await;

    let response = fixture.delete(&format!("/api/v1/counter/{}", id)).await;
    assert_status!(response, StatusCode::OK);

    let after = fixture.get(&format!("/api/v1/counter/{}", id)).await;
    assert_status!(after, StatusCode::NOT_FOUND);

    let list = fixture.get("/api/v1/counter/").await;
    assert!(list.body["data"]["counters"].as_array().unwrap().is_empty());

    let again = fixture.delete(&format!("/api/v1/counter/{}", id)).await;
    assert_status!(again, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_toggle_status_flips() {
    let fixture = TestFixture::new().await;
    let id = fixture.create_counter("Flip").await;
    let path = format!("/api/v1/counter/{}/toggle-status", id);

    let off = fixture.patch(&path).await;
    assert_status!(off, StatusCode::OK);
    assert_eq!(off.body["data"]["counter"]["isActive"], false);

    let on = fixture.patch(&path).await;
    assert_eq!(on.body["data"]["counter"]["isActive"], true);
}

#[tokio::test]
async fn test_toggle_busy_counter_is_blocked_by_default() {
    let fixture = TestFixture::new().await;
    let id = fixture.create_counter("Busy").await;
    fixture.issue("NORMAL").await;
    fixture
        .post("/api/v1/queue/call-next", json!({ "counterId": id }))
        .await;

    let response = fixture
        .patch(&format!("/api/v1/counter/{}/toggle-status", id))
        .await;
    assert_status!(response, StatusCode::CONFLICT);

    let delete = fixture.delete(&format!("/api/v1/counter/{}", id)).await;
    assert_status!(delete, StatusCode::CONFLICT);

    let counter = fixture.get(&format!("/api/v1/counter/{}", id)).await;
    assert_eq!(counter.body["data"]["counter"]["isActive"], true);
    assert_eq!(counter.body["data"]["counter"]["currentQueueNumber"], 1);
}

#[tokio::test]
async fn test_deactivating_busy_counter_with_skip_policy() {
    let fixture = TestFixture::with_config(TestConfig {
        busy_counter_policy: BusyCounterPolicy::Skip,
        ..Default::default()
    })
    .await;
    let id = fixture.create_counter("Busy").await;
    let (ticket, _) = fixture.issue("NORMAL").await;
    fixture
        .post("/api/v1/queue/call-next", json!({ "counterId": id }))
        .await;

    let response = fixture
        .put(&format!("/api/v1/counter/{}", id), json!({ "isActive": false }))
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["data"]["counter"]["isActive"], false);
    assert!(response.body["data"]["counter"]["currentQueueNumber"].is_null());

    let ticket = fixture.get(&format!("/api/v1/queue/{}", ticket)).await;
    assert_eq!(ticket.body["data"]["queue"]["status"], "SKIPPED");
}

#[tokio::test]
async fn test_deleting_busy_counter_with_complete_policy() {
    let fixture = TestFixture::with_config(TestConfig {
        busy_counter_policy: BusyCounterPolicy::Complete,
        ..Default::default()
    })
    .await;
    let id = fixture.create_counter("Busy").await;
    let (ticket, _) = fixture.issue("NORMAL").await;
    fixture
        .post("/api/v1/queue/call-next", json!({ "counterId": id }))
        .await;

    let response = fixture.delete(&format!("/api/v1/counter/{}", id)).await;
    assert_status!(response, StatusCode::OK);

    let ticket = fixture.get(&format!("/api/v1/queue/{}", ticket)).await;
    assert_eq!(ticket.body["data"]["queue"]["status"], "COMPLETED");
    assert_eq!(ticket.body["data"]["queue"]["counterId"], id);
}
