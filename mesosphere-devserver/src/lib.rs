//! HTTP front for a [`VectorEngine`], speaking the collection protocol.
//!
//! Success bodies are wrapped as `{"ok": true, "data": ...}`; failures are
//! `{"error": "<kind>", "message": "..."}` with a matching status code.

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use mesosphere::engine::VectorEngine;
use mesosphere::protocol::{
    AddItemsRequest, AddItemsResponse, AffectedRows, CollectionRecord, CreateCollectionRequest,
    DeleteItemsRequest, Envelope, ErrorBody, GetItemsRequest, GetItemsResponse, QueryRequest,
    QueryResponse, UpdateItemsRequest, API_KEY_HEADER,
};
use mesosphere::Error;
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    engine: Arc<dyn VectorEngine>,
    api_key: Option<String>,
}

impl AppState {
    /// `api_key = None` disables authentication.
    pub fn new(engine: Arc<dyn VectorEngine>, api_key: Option<String>) -> Self {
        Self { engine, api_key }
    }
}

/// Builds the router for every collection route.
pub fn router(state: AppState) -> Router {
    let collections = Router::new()
        .route("/", get(list_collections).post(create_collection))
        .route("/:name", get(get_collection).delete(delete_collection))
        .route("/:name/items/add", post(add_items))
        .route("/:name/items/get", post(get_items))
        .route("/:name/items/update", post(update_items))
        .route("/:name/items/delete", post(delete_items))
        .route("/:name/query", post(query));

    Router::new()
        .nest("/v1/vector/collections", collections)
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Error wrapper turning [`Error`] into an HTTP response.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            Error::ContractViolation(_) => (StatusCode::BAD_REQUEST, "ContractViolation"),
            Error::InvalidFilter(_) => (StatusCode::BAD_REQUEST, "InvalidFilter"),
            Error::DimensionMismatch { .. } => (StatusCode::BAD_REQUEST, "DimensionMismatch"),
            Error::Authentication(_) => (StatusCode::UNAUTHORIZED, "Authentication"),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            Error::AlreadyExists(_) => (StatusCode::CONFLICT, "AlreadyExists"),
            Error::Provider(_) => (StatusCode::BAD_GATEWAY, "Provider"),
            Error::InvalidResponse(_) => (StatusCode::BAD_GATEWAY, "InvalidResponse"),
            Error::Transport { status, .. } => (
                StatusCode::from_u16(*status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY),
                "Transport",
            ),
        };
        let body = ErrorBody {
            error: kind.to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(Envelope::ok(data)))
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(expected) = state.api_key.as_deref() {
        let supplied = request
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        if supplied != Some(expected) {
            return ApiError(Error::Authentication("missing or invalid API key".into()))
                .into_response();
        }
    }
    next.run(request).await
}

async fn create_collection(
    State(state): State<AppState>,
    Json(request): Json<CreateCollectionRequest>,
) -> Result<(StatusCode, Json<Envelope<CollectionRecord>>), ApiError> {
    let record = state.engine.create_collection(request).await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(record))))
}

async fn list_collections(
    State(state): State<AppState>,
) -> ApiResult<Vec<CollectionRecord>> {
    ok(state.engine.list_collections().await?)
}

async fn get_collection(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<CollectionRecord> {
    ok(state.engine.get_collection(&name).await?)
}

async fn delete_collection(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<AffectedRows> {
    ok(state.engine.delete_collection(&name).await?)
}

async fn add_items(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<AddItemsRequest>,
) -> ApiResult<AddItemsResponse> {
    ok(state.engine.add_items(&name, request).await?)
}

async fn get_items(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<GetItemsRequest>,
) -> ApiResult<GetItemsResponse> {
    ok(state.engine.get_items(&name, request).await?)
}

async fn update_items(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<UpdateItemsRequest>,
) -> ApiResult<AffectedRows> {
    ok(state.engine.update_items(&name, request).await?)
}

async fn delete_items(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<DeleteItemsRequest>,
) -> ApiResult<AffectedRows> {
    ok(state.engine.delete_items(&name, request).await?)
}

async fn query(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<QueryRequest>,
) -> ApiResult<QueryResponse> {
    ok(state.engine.query(&name, request).await?)
}
