// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP API
//!
//! Event ingestion, read paths and per-agent maintenance over axum. Every
//! response, errors included, uses the `{success, data, message}` envelope.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET | `/` | banner |
//! | GET | `/health` | liveness |
//! | POST | `/api/v1/kube_events` | apply one change event |
//! | GET | `/api/v1/kube_objects/{kind}` | list (`?agent=&namespace=`) |
//! | GET | `/api/v1/kube_objects/{kind}/agents/{agent}/objects/{name}` | get one (`?namespace=`) |
//! | PUT | `/api/v1/kube_objects/{kind}/agents/{agent}` | resync an agent's snapshot |
//! | DELETE | `/api/v1/kube_objects/{kind}/agents/{agent}` | purge an agent's objects |

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::application::agent_indexer::AgentIndexHandle;
use crate::application::event_router::{KubeEventRouter, RouteOutcome};
use crate::application::query::{QueryError, ResourceQueryService};
use crate::application::reconciler::{ReconcileError, ResourceReconciler};
use crate::domain::config::UpdateKeySource;
use crate::domain::registry::{ResourceDescriptor, ResourceRegistry};
use crate::domain::repository::DocumentStore;

pub const INDEX_MESSAGE: &str = "This is lighthouse command service";
pub const HEALTH_MESSAGE: &str = "I am live!";

/// Response envelope shared by every route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseDto {
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    pub message: String,
}

impl ResponseDto {
    pub fn ok(data: Value, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::Repository(e) => ApiError::Internal(e.to_string()),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Repository(e) => ApiError::Internal(e.to_string()),
            other => ApiError::NotFound(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(ResponseDto::failure(self.to_string()))).into_response()
    }
}

type ApiResult = Result<Json<ResponseDto>, ApiError>;

/// Services shared by the handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ResourceRegistry>,
    pub router: Arc<KubeEventRouter>,
    pub reconciler: Arc<ResourceReconciler>,
    pub queries: Arc<ResourceQueryService>,
}

impl AppState {
    /// Wires the built-in registry, the reconciler and the read paths over one store.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        indexer: AgentIndexHandle,
        update_key_source: UpdateKeySource,
    ) -> Self {
        let registry = Arc::new(ResourceRegistry::builtin());
        let reconciler = Arc::new(ResourceReconciler::new(store.clone(), indexer, update_key_source));
        Self {
            router: Arc::new(KubeEventRouter::new(registry.clone(), reconciler.clone())),
            queries: Arc::new(ResourceQueryService::new(store, registry.clone())),
            registry,
            reconciler,
        }
    }

    fn descriptor(&self, kind: &str) -> Result<&ResourceDescriptor, ApiError> {
        self.registry
            .resolve(kind)
            .ok_or_else(|| ApiError::NotFound(format!("Unknown object kind: {}", kind)))
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/v1/kube_events", post(kube_events))
        .route("/api/v1/kube_objects/{kind}", get(list_objects))
        .route(
            "/api/v1/kube_objects/{kind}/agents/{agent}/objects/{name}",
            get(get_object),
        )
        .route(
            "/api/v1/kube_objects/{kind}/agents/{agent}",
            put(resync_objects).delete(purge_objects),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

async fn index() -> Json<ResponseDto> {
    Json(ResponseDto::ok(Value::Null, INDEX_MESSAGE))
}

async fn health() -> Json<ResponseDto> {
    Json(ResponseDto::ok(Value::Null, HEALTH_MESSAGE))
}

async fn kube_events(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult {
    let event = KubeEventRouter::decode(&body)?;
    let response = match state.router.route(event).await? {
        RouteOutcome::Added(document) => ResponseDto::ok(document, "object added"),
        RouteOutcome::Updated(document) => ResponseDto::ok(document, "object updated"),
        RouteOutcome::Deleted { removed: true } => ResponseDto::ok(Value::Null, "object deleted"),
        RouteOutcome::Deleted { removed: false } => {
            ResponseDto::ok(Value::Null, "object was not mirrored, nothing deleted")
        }
        RouteOutcome::Ignored { kind_tag } => {
            ResponseDto::ok(Value::Null, format!("unknown object kind '{}' ignored", kind_tag))
        }
    };
    Ok(Json(response))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub agent: Option<String>,
    pub namespace: Option<String>,
}

async fn list_objects(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult {
    let objects = state
        .queries
        .list(&kind, params.agent.as_deref(), params.namespace.as_deref())
        .await?;
    let message = format!("{} {} objects", objects.len(), kind);
    Ok(Json(ResponseDto::ok(Value::Array(objects), message)))
}

#[derive(Debug, Default, Deserialize)]
pub struct NamespaceParams {
    pub namespace: Option<String>,
}

async fn get_object(
    State(state): State<Arc<AppState>>,
    Path((kind, agent, name)): Path<(String, String, String)>,
    Query(params): Query<NamespaceParams>,
) -> ApiResult {
    let object = state
        .queries
        .get(&kind, &agent, &name, params.namespace.as_deref())
        .await?;
    Ok(Json(ResponseDto::ok(object, "object found")))
}

async fn resync_objects(
    State(state): State<Arc<AppState>>,
    Path((kind, agent)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult {
    let descriptor = state.descriptor(&kind)?;
    let objects: Vec<Value> = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Snapshot must be a JSON array: {}", e)))?;

    let summary = state.reconciler.resync(descriptor, &agent, objects).await?;
    Ok(Json(ResponseDto::ok(
        json!({ "removed": summary.removed, "inserted": summary.inserted }),
        "snapshot applied",
    )))
}

async fn purge_objects(
    State(state): State<Arc<AppState>>,
    Path((kind, agent)): Path<(String, String)>,
) -> ApiResult {
    let descriptor = state.descriptor(&kind)?;
    let removed = state.reconciler.purge(descriptor, &agent).await?;
    Ok(Json(ResponseDto::ok(json!({ "removed": removed }), "objects purged")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::RepositoryError;

    #[test]
    fn test_error_status_mapping() {
        let decode: ApiError = ReconcileError::Decode("bad".to_string()).into();
        assert_eq!(decode.status(), StatusCode::BAD_REQUEST);

        let owner: ApiError = ReconcileError::MissingOwner.into();
        assert_eq!(owner.status(), StatusCode::BAD_REQUEST);

        let store: ApiError = ReconcileError::Repository(RepositoryError::Database("down".to_string())).into();
        assert_eq!(store.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let unknown: ApiError = QueryError::UnknownKind("cronJob".to_string()).into();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_failure_envelope() {
        let response = ApiError::BadRequest("nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
