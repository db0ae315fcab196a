use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::VectorEngine;
use crate::protocol::{
    AddItemsRequest, AddItemsResponse, AffectedRows, CollectionListing, CollectionRecord,
    CreateCollectionRequest, DeleteItemsRequest, ErrorBody, GetItemsRequest, GetItemsResponse,
    QueryRequest, QueryResponse, UpdateItemsRequest, API_KEY_HEADER, COLLECTIONS_PATH,
};
use crate::{Error, Result};

/// Engine speaking the collection API over HTTP.
///
/// Every request carries the API key header and is bounded by the
/// configured timeout. Collection names are percent-encoded as single path
/// segments, so `a/b` cannot escape its collection.
#[derive(Debug, Clone)]
pub struct HttpEngine {
    base: Url,
    client: reqwest::Client,
}

impl HttpEngine {
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(api_url)
            .map_err(|e| Error::contract(format!("invalid api_url '{api_url}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::contract(format!("api_url '{api_url}' cannot be a base URL")));
        }

        let mut key = HeaderValue::from_str(api_key)
            .map_err(|_| Error::contract("api_key contains invalid header characters"))?;
        key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::transport(0, format!("cannot build HTTP client: {e}")))?;

        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// `{base}/v1/vector/collections/{segments...}`
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::contract("api_url cannot be a base URL"))?
            .pop_if_empty()
            .extend(COLLECTIONS_PATH)
            .extend(segments);
        Ok(url)
    }

    async fn call<T: DeserializeOwned>(&self, method: Method, url: Url) -> Result<T> {
        debug!(%method, path = url.path(), "sending request");
        let request = self.client.request(method, url);
        execute(request).await
    }

    async fn call_json<B, T>(&self, method: Method, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!(%method, path = url.path(), "sending request");
        let request = self.client.request(method, url).json(body);
        execute(request).await
    }
}

async fn execute<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T> {
    let response = request.send().await.map_err(from_reqwest)?;
    let status = response.status();
    let body = response.bytes().await.map_err(from_reqwest)?;
    debug!(status = status.as_u16(), bytes = body.len(), "received response");

    if !status.is_success() {
        return Err(status_error(status, &body));
    }
    decode(status, &body)
}

/// Unwraps `{ok, data}` when present, then decodes the payload.
fn decode<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T> {
    let value: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(body)
            .map_err(|e| Error::InvalidResponse(format!("response is not JSON: {e}")))?
    };

    let payload = match value {
        Value::Object(mut map) if map.contains_key("ok") && map.contains_key("data") => {
            if map.get("ok") != Some(&Value::Bool(true)) {
                return Err(Error::transport(status.as_u16(), "request failed with ok=false"));
            }
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };

    serde_json::from_value(payload)
        .map_err(|e| Error::InvalidResponse(format!("unexpected response shape: {e}")))
}

/// Maps a non-2xx response onto the error taxonomy.
fn status_error(status: StatusCode, body: &[u8]) -> Error {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            if text.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                text
            }
        });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Authentication(message),
        StatusCode::NOT_FOUND => Error::NotFound(message),
        StatusCode::CONFLICT => Error::AlreadyExists(message),
        _ => Error::transport(status.as_u16(), message),
    }
}

/// Timeouts become status 408; failures without a response become status 0.
fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        return Error::transport(StatusCode::REQUEST_TIMEOUT.as_u16(), e.to_string());
    }
    let status = e.status().map_or(0, |s| s.as_u16());
    Error::transport(status, e.to_string())
}

#[async_trait]
impl VectorEngine for HttpEngine {
    #[instrument(skip(self, request), fields(name = %request.name))]
    async fn create_collection(&self, request: CreateCollectionRequest) -> Result<CollectionRecord> {
        self.call_json(Method::POST, self.url(&[])?, &request).await
    }

    #[instrument(skip(self))]
    async fn get_collection(&self, name: &str) -> Result<CollectionRecord> {
        self.call(Method::GET, self.url(&[name])?).await
    }

    #[instrument(skip(self))]
    async fn list_collections(&self) -> Result<Vec<CollectionRecord>> {
        let listing: CollectionListing = self.call(Method::GET, self.url(&[])?).await?;
        Ok(listing.into_records())
    }

    #[instrument(skip(self))]
    async fn delete_collection(&self, name: &str) -> Result<AffectedRows> {
        self.call(Method::DELETE, self.url(&[name])?).await
    }

    #[instrument(skip(self, request), fields(count = request.ids.len()))]
    async fn add_items(&self, collection: &str, request: AddItemsRequest) -> Result<AddItemsResponse> {
        self.call_json(Method::POST, self.url(&[collection, "items", "add"])?, &request)
            .await
    }

    #[instrument(skip(self, request))]
    async fn get_items(&self, collection: &str, request: GetItemsRequest) -> Result<GetItemsResponse> {
        self.call_json(Method::POST, self.url(&[collection, "items", "get"])?, &request)
            .await
    }

    #[instrument(skip(self, request), fields(count = request.ids.len()))]
    async fn update_items(&self, collection: &str, request: UpdateItemsRequest) -> Result<AffectedRows> {
        self.call_json(Method::POST, self.url(&[collection, "items", "update"])?, &request)
            .await
    }

    #[instrument(skip(self, request), fields(count = request.ids.len()))]
    async fn delete_items(&self, collection: &str, request: DeleteItemsRequest) -> Result<AffectedRows> {
        self.call_json(Method::POST, self.url(&[collection, "items", "delete"])?, &request)
            .await
    }

    #[instrument(skip(self, request))]
    async fn query(&self, collection: &str, request: QueryRequest) -> Result<QueryResponse> {
        self.call_json(Method::POST, self.url(&[collection, "query"])?, &request)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine(base: &str) -> HttpEngine {
        HttpEngine::new(base, "key", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_url_building() {
        let e = engine("http://localhost:8000");
        assert_eq!(
            e.url(&["docs", "items", "get"]).unwrap().as_str(),
            "http://localhost:8000/v1/vector/collections/docs/items/get"
        );
        assert_eq!(
            e.url(&[]).unwrap().as_str(),
            "http://localhost:8000/v1/vector/collections"
        );
    }

    #[test]
    fn test_url_keeps_base_path_and_encodes_names() {
        let e = engine("https://api.example.com/prefix/");
        assert_eq!(
            e.url(&["a/b c"]).unwrap().as_str(),
            "https://api.example.com/prefix/v1/vector/collections/a%2Fb%20c"
        );
    }

    #[test]
    fn test_rejects_non_base_url() {
        let err = HttpEngine::new("mailto:someone@example.com", "key", Duration::from_secs(1))
            .unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_decode_envelope_and_bare() {
        let wrapped: AffectedRows = decode(
            StatusCode::OK,
            json!({"ok": true, "data": {"affected_rows": 3}}).to_string().as_bytes(),
        )
        .unwrap();
        assert_eq!(wrapped.affected_rows, 3);

        let bare: AffectedRows =
            decode(StatusCode::OK, br#"{"affected_rows": 1}"#).unwrap();
        assert_eq!(bare.affected_rows, 1);
    }

    #[test]
    fn test_decode_ok_false_is_transport_error() {
        let err = decode::<Value>(StatusCode::OK, br#"{"ok": false, "data": null}"#).unwrap_err();
        assert!(matches!(err, Error::Transport { status: 200, .. }));
    }

    #[test]
    fn test_decode_wrong_shape_is_invalid_response() {
        let err = decode::<AffectedRows>(StatusCode::OK, br#"{"rows": 1}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
        let err = decode::<AffectedRows>(StatusCode::OK, b"<html>").unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }

    #[test]
    fn test_status_mapping() {
        let body = json!({"error": "NotFound", "message": "collection 'x' does not exist"})
            .to_string();
        match status_error(StatusCode::NOT_FOUND, body.as_bytes()) {
            Error::NotFound(message) => assert_eq!(message, "collection 'x' does not exist"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, b""),
            Error::Authentication(_)
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, b"nope"),
            Error::Authentication(_)
        ));
        assert!(matches!(
            status_error(StatusCode::CONFLICT, b""),
            Error::AlreadyExists(_)
        ));
        match status_error(StatusCode::BAD_GATEWAY, b"upstream down") {
            Error::Transport { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_server_is_status_zero() {
        let e = engine("http://127.0.0.1:9");
        let err = e.get_collection("docs").await.unwrap_err();
        assert!(matches!(err, Error::Transport { status: 0, .. }));
    }
}
