// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use lighthouse_command_core::application::agent_indexer::AgentIndexHandle;
use lighthouse_command_core::domain::config::UpdateKeySource;
use lighthouse_command_core::domain::repository::{DocumentFilter, DocumentStore, RepositoryError};
use lighthouse_command_core::infrastructure::repositories::InMemoryDocumentStore;
use lighthouse_command_core::presentation::api::{app, AppState, ResponseDto, HEALTH_MESSAGE, INDEX_MESSAGE};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn service(store: Arc<dyn DocumentStore>) -> Router {
    app(AppState::new(store, AgentIndexHandle::disabled(), UpdateKeySource::Old))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, ResponseDto) {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn event(command: &str, kind: &str, body: Value) -> Value {
    json!({
        "header": {"command": command, "extras": {"object": kind, "agent": "a1"}},
        "body": body
    })
}

fn pod(name: &str) -> Value {
    json!({"metadata": {"name": name, "namespace": "default"}})
}

/// Store whose every operation fails.
struct UnavailableStore;

#[async_trait]
impl DocumentStore for UnavailableStore {
    async fn find_one(&self, _: &str, _: &DocumentFilter) -> Result<Option<Value>, RepositoryError> {
        Err(RepositoryError::Database("connection refused".to_string()))
    }
    async fn find_many(&self, _: &str, _: &DocumentFilter) -> Result<Vec<Value>, RepositoryError> {
        Err(RepositoryError::Database("connection refused".to_string()))
    }
    async fn insert_one(&self, _: &str, _: Value) -> Result<(), RepositoryError> {
        Err(RepositoryError::Database("connection refused".to_string()))
    }
    async fn insert_many(&self, _: &str, _: Vec<Value>) -> Result<u64, RepositoryError> {
        Err(RepositoryError::Database("connection refused".to_string()))
    }
    async fn upsert_one(&self, _: &str, _: &DocumentFilter, _: Value) -> Result<Value, RepositoryError> {
        Err(RepositoryError::Database("connection refused".to_string()))
    }
    async fn delete_one(&self, _: &str, _: &DocumentFilter) -> Result<u64, RepositoryError> {
        Err(RepositoryError::Database("connection refused".to_string()))
    }
    async fn delete_many(&self, _: &str, _: &DocumentFilter) -> Result<u64, RepositoryError> {
        Err(RepositoryError::Database("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_index_and_health() {
    let app = service(Arc::new(InMemoryDocumentStore::new()));

    let (status, body) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.message, INDEX_MESSAGE);

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.message, HEALTH_MESSAGE);
}

#[tokio::test]
async fn test_event_ingestion_round_trip() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let app = service(store.clone());

    let (status, body) = send(&app, Method::POST, "/api/v1/kube_events", Some(event("ADD", "pod", pod("web-1")))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.success);
    assert_eq!(body.data["obj"]["kind"], "Pod");

    let update = event(
        "UPDATE",
        "pod",
        json!({"old_k8s_obj": pod("web-1"), "new_k8s_obj": {"metadata": {"name": "web-1", "namespace": "default"}, "status": {"phase": "Running"}}}),
    );
    let (status, body) = send(&app, Method::POST, "/api/v1/kube_events", Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.data["obj"]["status"]["phase"], "Running");

    let (status, body) = send(&app, Method::GET, "/api/v1/kube_objects/pod/agents/a1/objects/web-1?namespace=default", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.data["status"]["phase"], "Running");

    let (status, body) = send(&app, Method::POST, "/api/v1/kube_events", Some(event("DELETE", "pod", pod("web-1")))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.success);
    assert_eq!(store.total(), 0);
}

#[tokio::test]
async fn test_rejected_events_return_bad_request() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let app = service(store.clone());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/kube_events")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let cases = vec![
        event("PATCH", "pod", pod("p")),
        event("ADD", "pod", json!("just a string")),
        event("UPDATE", "pod", json!({"new_k8s_obj": pod("p")})),
        event("ADD", "pod", json!({"metadata": {"name": "p"}})),
        json!({"header": {"command": "ADD", "extras": {"object": "pod"}}, "body": pod("p")}),
    ];
    for case in cases {
        let (status, body) = send(&app, Method::POST, "/api/v1/kube_events", Some(case)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
    }
    assert_eq!(store.total(), 0);
}

#[tokio::test]
async fn test_unknown_kind_is_acknowledged() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let app = service(store.clone());

    let (status, body) = send(&app, Method::POST, "/api/v1/kube_events", Some(event("ADD", "cronJob", pod("p")))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.success);
    assert!(body.message.contains("ignored"));
    assert_eq!(store.total(), 0);

    let (status, _) = send(&app, Method::GET, "/api/v1/kube_objects/cronJob", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_store_failure_returns_internal_error() {
    let app = service(Arc::new(UnavailableStore));

    let (status, body) = send(&app, Method::POST, "/api/v1/kube_events", Some(event("ADD", "pod", pod("p")))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.success);
    assert!(body.message.contains("connection refused"));
}

#[tokio::test]
async fn test_resync_list_and_purge() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let app = service(store.clone());

    send(&app, Method::POST, "/api/v1/kube_events", Some(event("ADD", "pod", pod("stale")))).await;

    let snapshot = json!([pod("web-1"), pod("web-2")]);
    let (status, body) = send(&app, Method::PUT, "/api/v1/kube_objects/pod/agents/a1", Some(snapshot)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.data, json!({"removed": 1, "inserted": 2}));

    let (status, body) = send(&app, Method::GET, "/api/v1/kube_objects/pod?agent=a1&namespace=default", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.data.as_array().map(Vec::len), Some(2));

    let (status, _) = send(&app, Method::PUT, "/api/v1/kube_objects/pod/agents/a1", Some(json!({"not": "an array"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::DELETE, "/api/v1/kube_objects/pod/agents/a1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.data, json!({"removed": 2}));
    assert_eq!(store.total(), 0);

    let (status, _) = send(&app, Method::GET, "/api/v1/kube_objects/pod/agents/a1/objects/web-1?namespace=default", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
