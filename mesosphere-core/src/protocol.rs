//! Wire models for the vector collection protocol.
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | POST | `/v1/vector/collections` | [`CreateCollectionRequest`] | [`CollectionRecord`] |
//! | GET | `/v1/vector/collections` | | [`CollectionListing`] |
//! | GET | `/v1/vector/collections/{name}` | | [`CollectionRecord`] |
//! | DELETE | `/v1/vector/collections/{name}` | | [`AffectedRows`] |
//! | POST | `…/{name}/items/add` | [`AddItemsRequest`] | [`AddItemsResponse`] |
//! | POST | `…/{name}/items/get` | [`GetItemsRequest`] | [`GetItemsResponse`] |
//! | POST | `…/{name}/items/update` | [`UpdateItemsRequest`] | [`AffectedRows`] |
//! | POST | `…/{name}/items/delete` | [`DeleteItemsRequest`] | [`AffectedRows`] |
//! | POST | `…/{name}/query` | [`QueryRequest`] | [`QueryResponse`] |
//!
//! Responses may arrive wrapped in an [`Envelope`]. Every request carries the
//! API key in the [`API_KEY_HEADER`] header.

use serde::{Deserialize, Serialize};

use crate::filter::{DocumentFilter, Where};
use crate::metadata::Metadata;
use crate::row::Embedding;

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Path segments of the collections resource.
pub const COLLECTIONS_PATH: [&str; 3] = ["v1", "vector", "collections"];

/// Columns a caller may ask to be returned next to ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Include {
    Documents,
    Metadatas,
    /// Query only.
    Distances,
}

impl Include {
    /// Default columns for `items/get`.
    pub const GET_DEFAULT: [Include; 2] = [Include::Documents, Include::Metadatas];
    /// Default columns for `query`.
    pub const QUERY_DEFAULT: [Include; 3] =
        [Include::Documents, Include::Metadatas, Include::Distances];
}

/// Success envelope `{"ok": true, "data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub ok: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self { ok: true, data }
    }
}

/// Error body `{"error": "NotFound", "message": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCollectionRequest {
    pub name: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Collection descriptor returned by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    pub created_at: String,
    pub updated_at: String,
}

/// `GET /v1/vector/collections` body: a bare array, or one wrapped under
/// `collections` or `items`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollectionListing {
    Bare(Vec<CollectionRecord>),
    Collections { collections: Vec<CollectionRecord> },
    Items { items: Vec<CollectionRecord> },
}

impl CollectionListing {
    pub fn into_records(self) -> Vec<CollectionRecord> {
        match self {
            CollectionListing::Bare(records)
            | CollectionListing::Collections {
                collections: records,
            }
            | CollectionListing::Items { items: records } => records,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItemsRequest {
    pub ids: Vec<String>,
    pub embeddings: Vec<Embedding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadatas: Option<Vec<Metadata>>,
}

/// Ids accepted by `items/add`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItemsResponse {
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetItemsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Where>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub where_document: Option<DocumentFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<Include>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

/// Flat, index-aligned rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetItemsResponse {
    pub ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<Option<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadatas: Option<Vec<Option<Metadata>>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_embeddings: Option<Vec<Embedding>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_texts: Option<Vec<String>>,
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Where>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub where_document: Option<DocumentFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_results: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<Include>>,
}

/// One inner list per query, nearest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    pub ids: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadatas: Option<Vec<Vec<Option<Metadata>>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distances: Option<Vec<Vec<f64>>>,
}

/// Replacement columns for existing ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateItemsRequest {
    pub ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeddings: Option<Vec<Embedding>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadatas: Option<Vec<Metadata>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteItemsRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedRows {
    pub affected_rows: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_request_omits_unset_fields() {
        let request = GetItemsRequest {
            filter: Some(Where::field("tag").eq("a")),
            limit: Some(5),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"where": {"tag": "a"}, "limit": 5})
        );
    }

    #[test]
    fn test_query_response_without_optional_columns() {
        let response: QueryResponse =
            serde_json::from_value(json!({"ids": [["a", "b"], []]})).unwrap();
        assert_eq!(response.ids.len(), 2);
        assert!(response.documents.is_none());
        assert!(response.distances.is_none());
    }

    #[test]
    fn test_include_names() {
        let include = vec![Include::Documents, Include::Metadatas, Include::Distances];
        assert_eq!(
            serde_json::to_value(&include).unwrap(),
            json!(["documents", "metadatas", "distances"])
        );
    }

    #[test]
    fn test_collection_listing_shapes() {
        let record = json!({
            "id": "c1", "name": "docs", "metadata": null,
            "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z"
        });
        for body in [
            json!([record.clone()]),
            json!({"collections": [record.clone()]}),
            json!({"items": [record.clone()]}),
        ] {
            let listing: CollectionListing = serde_json::from_value(body).unwrap();
            let records = listing.into_records();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].name, "docs");
            assert!(records[0].metadata.is_none());
        }
    }

    #[test]
    fn test_envelope() {
        let envelope: Envelope<AddItemsResponse> =
            serde_json::from_value(json!({"ok": true, "data": {"ids": ["x"]}})).unwrap();
        assert!(envelope.ok);
        assert_eq!(envelope.data.ids, vec!["x"]);
    }
}
