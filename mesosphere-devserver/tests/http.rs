use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use mesosphere::engine::MemoryEngine;
use mesosphere::prelude::*;
use mesosphere_devserver::{router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

const KEY: &str = "test-key";

fn app() -> axum::Router {
    router(AppState::new(Arc::new(MemoryEngine::new()), Some(KEY.to_string())))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Serves on an ephemeral port and returns the base URL.
async fn spawn_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app()).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_missing_key_is_unauthorized() {
    let response = app()
        .oneshot(
            Request::get("/v1/vector/collections")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Authentication");
}

#[tokio::test]
async fn test_success_is_enveloped() {
    let response = app()
        .oneshot(
            Request::post("/v1/vector/collections")
                .header("X-API-Key", KEY)
                .header("content-type", "application/json")
                .body(Body::from(json!({"name": "docs"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["data"]["name"], "docs");
}

#[tokio::test]
async fn test_unknown_collection_is_404_body() {
    let response = app()
        .oneshot(
            Request::get("/v1/vector/collections/missing")
                .header("X-API-Key", KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn test_client_round_trip_over_http() {
    let base = spawn_server().await;
    let client = Client::new(
        ClientConfig::new(base, KEY).with_timeout(Duration::from_secs(5)),
    )
    .unwrap();

    let docs = client.get_or_create_collection("docs", None).await.unwrap();
    docs.add(
        AddItems::new(["id1"])
            .with_embeddings(vec![vec![0.2, 0.8]])
            .with_documents(["hello world"])
            .with_metadatas(vec![Metadata::new().with_field("tag", "a")]),
    )
    .await
    .unwrap();

    let hit = docs
        .get(GetItems::new().with_where(Where::field("tag").eq("a")))
        .await
        .unwrap();
    assert_eq!(hit.ids, vec!["id1"]);
    assert_eq!(
        hit.metadatas,
        Some(vec![Some(Metadata::new().with_field("tag", "a"))])
    );

    let miss = docs
        .get(GetItems::new().with_where(Where::field("tag").eq("b")))
        .await
        .unwrap();
    assert!(miss.ids.is_empty());

    let result = docs
        .query(QueryItems::embeddings(vec![vec![0.2, 0.8]]).with_n_results(1))
        .await
        .unwrap();
    assert_eq!(result.ids, vec![vec!["id1".to_string()]]);

    let again = client.get_or_create_collection("docs", None).await.unwrap();
    assert_eq!(again.id(), docs.id());

    let err = client.get_collection("missing").await.unwrap_err();
    assert!(err.is_not_found());

    let err = docs
        .add(AddItems::new(["id1"]).with_embeddings(vec![vec![0.1, 0.1]]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));
}

#[tokio::test]
async fn test_wrong_key_maps_to_authentication_error() {
    let base = spawn_server().await;
    let client = Client::new(ClientConfig::new(base, "wrong")).unwrap();
    let err = client.list_collections().await.unwrap_err();
    assert!(matches!(err, Error::Authentication(_)));
}

#[tokio::test]
async fn test_dimension_mismatch_is_transport_400() {
    let base = spawn_server().await;
    let client = Client::new(ClientConfig::new(base, KEY)).unwrap();
    let docs = client.create_collection("dims", None).await.unwrap();
    docs.add(AddItems::new(["a"]).with_embeddings(vec![vec![1.0, 0.0]]))
        .await
        .unwrap();

    let err = docs
        .query(QueryItems::embeddings(vec![vec![1.0, 0.0, 0.0]]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport { status: 400, .. }));
}
