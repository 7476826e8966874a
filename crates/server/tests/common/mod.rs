//! Common test utilities for driving the router in-process.
//!
//! The fixture wires the real SQLite stores (in a temp dir), the queue
//! service, the audit writer and the status broadcaster, exactly as `main`
//! does, and exposes helpers that send requests through `oneshot`.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use queuedesk_core::{
    create_audit_system, create_authenticator, load_config_from_str, AuditStore,
    BusyCounterPolicy, CallNextPolicy, Config, CounterStore, QueueChange, QueueService,
    SqliteAuditStore, SqliteCounterStore, SqliteTicketStore, StatusBroadcaster, TicketStore,
};
use queuedesk_server::{create_router, AppState};

/// Operator token used when a fixture enables API-key auth.
pub const TEST_API_KEY: &str = "test-operator-key";

/// In-process server with real stores in a temporary directory.
pub struct TestFixture {
    pub router: Router,
    pub queue: Arc<QueueService>,
    pub broadcaster: StatusBroadcaster,
    pub audit_store: Arc<dyn AuditStore>,
    /// Token attached to every request, if auth is enabled
    token: Option<String>,
    /// Keeps the database alive for the fixture's lifetime
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    pub require_auth: bool,
    pub call_next_policy: CallNextPolicy,
    pub busy_counter_policy: BusyCounterPolicy,
}

impl TestConfig {
    pub fn with_auth() -> Self {
        Self {
            require_auth: true,
            ..Default::default()
        }
    }
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let auth = if test_config.require_auth {
            format!("method = \"api_key\"\napi_key = \"{}\"", TEST_API_KEY)
        } else {
            "method = \"none\"".to_string()
        };
        let mut config: Config = load_config_from_str(&format!(
            "[auth]\n{}\n\n[database]\npath = {:?}\n",
            auth, db_path
        ))
        .expect("Failed to parse test config");
        config.queue.call_next_policy = test_config.call_next_policy;
        config.queue.busy_counter_policy = test_config.busy_counter_policy;

        let authenticator =
            create_authenticator(&config.auth).expect("Failed to create authenticator");

        let audit_store: Arc<dyn AuditStore> = Arc::new(
            SqliteAuditStore::new(&db_path).expect("Failed to create audit store"),
        );
        let tickets: Arc<dyn TicketStore> = Arc::new(
            SqliteTicketStore::new(&db_path).expect("Failed to create ticket store"),
        );
        let counters: Arc<dyn CounterStore> = Arc::new(
            SqliteCounterStore::new(&db_path).expect("Failed to create counter store"),
        );

        let (audit_handle, audit_writer) = create_audit_system(Arc::clone(&audit_store), 100);
        tokio::spawn(audit_writer.run());

        let service = QueueService::new(&config.queue, &config.maintenance, tickets, counters);
        let broadcaster =
            StatusBroadcaster::new(config.broadcaster.clone(), service.status_aggregator());
        let broadcaster_for_callback = broadcaster.clone();
        let queue = Arc::new(
            service
                .with_audit(audit_handle)
                .with_update_callback(Arc::new(move |change: QueueChange| {
                    broadcaster_for_callback.refresh(&change);
                })),
        );

        let state = Arc::new(AppState::new(
            config,
            authenticator,
            Arc::clone(&audit_store),
            Arc::clone(&queue),
            broadcaster.clone(),
        ));

        Self {
            router: create_router(state),
            queue,
            broadcaster,
            audit_store,
            token: test_config.require_auth.then(|| TEST_API_KEY.to_string()),
            temp_dir,
        }
    }

    /// Same fixture, but requests carry no credentials.
    pub fn anonymous(mut self) -> Self {
        self.token = None;
        self
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// POST with no body at all.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    pub async fn patch(&self, path: &str) -> TestResponse {
        self.request("PATCH", path, None).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// POST a raw string body (for malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = self
            .builder("POST", path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Create a counter through the API and return its id.
    pub async fn create_counter(&self, name: &str) -> i64 {
        let response = self
            .post("/api/v1/counter/", serde_json::json!({ "name": name }))
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["data"]["counter"]["id"].as_i64().unwrap()
    }

    /// Issue a ticket through the API and return `(id, queueNumber)`.
    pub async fn issue(&self, priority: &str) -> (i64, i64) {
        let response = self
            .post(
                "/api/v1/queue/generate-ticket",
                serde_json::json!({ "priority": priority }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        let queue = &response.body["data"]["queue"];
        (queue["id"].as_i64().unwrap(), queue["queueNumber"].as_i64().unwrap())
    }

    fn builder(&self, method: &str, path: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(path);
        match &self.token {
            Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
            None => builder,
        }
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut builder = self.builder(method, path);
        let body = match body {
            Some(json_body) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_vec(&json_body).unwrap())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
