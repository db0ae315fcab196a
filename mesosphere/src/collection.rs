//! Handle to one named collection.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::embedding::EmbeddingFunction;
use crate::engine::VectorEngine;
use crate::protocol::{
    AddItemsRequest, CollectionRecord, DeleteItemsRequest, GetItemsRequest, QueryRequest,
    UpdateItemsRequest,
};
use crate::request::{AddItems, DeleteItems, GetItems, QueryItems, UpdateItems};
use crate::result::{GetResult, QueryResult};
use crate::{Embedding, Error, Metadata, Result};

/// A collection handle returned by [`Client`](crate::Client).
///
/// The handle caches the collection record it was created from; it does not
/// refresh `metadata` or `updated_at` on its own.
///
/// Every operation validates its request first and fails with
/// [`Error::ContractViolation`] before any network call. Operations that
/// need embeddings run the provider call and the engine call one after the
/// other; dropping the returned future between the two means the engine call
/// is never made.
#[derive(Clone)]
pub struct Collection {
    record: CollectionRecord,
    metadata: Metadata,
    engine: Arc<dyn VectorEngine>,
    embedder: Option<Arc<dyn EmbeddingFunction>>,
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.record.name)
            .field("id", &self.record.id)
            .field("has_embedding_function", &self.embedder.is_some())
            .finish_non_exhaustive()
    }
}

impl Collection {
    pub(crate) fn new(
        record: CollectionRecord,
        engine: Arc<dyn VectorEngine>,
        embedder: Option<Arc<dyn EmbeddingFunction>>,
    ) -> Self {
        let metadata = record.metadata.clone().unwrap_or_default();
        Self {
            record,
            metadata,
            engine,
            embedder,
        }
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// Collection-level metadata; empty when the engine sent none.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn created_at(&self) -> &str {
        &self.record.created_at
    }

    pub fn updated_at(&self) -> &str {
        &self.record.updated_at
    }

    pub fn record(&self) -> &CollectionRecord {
        &self.record
    }

    /// Adds rows and returns the ids the engine accepted.
    ///
    /// Without explicit embeddings, `documents` are embedded in one batch.
    #[instrument(skip_all, fields(collection = %self.record.name, count = items.ids.len()))]
    pub async fn add(&self, items: AddItems) -> Result<Vec<String>> {
        items.validate()?;
        let embeddings = match items.embeddings {
            Some(embeddings) => embeddings,
            None => {
                let documents = items
                    .documents
                    .as_deref()
                    .ok_or_else(|| Error::contract("add needs embeddings or documents"))?;
                self.ensure_embedder()?;
                self.embed(documents).await?
            }
        };

        debug!("sending rows to engine");
        let response = self
            .engine
            .add_items(
                self.name(),
                AddItemsRequest {
                    ids: items.ids,
                    embeddings,
                    documents: items.documents,
                    metadatas: items.metadatas,
                },
            )
            .await?;
        Ok(response.ids)
    }

    /// Reads rows matching the request, in engine order.
    #[instrument(skip_all, fields(collection = %self.record.name))]
    pub async fn get(&self, request: GetItems) -> Result<GetResult> {
        request.validate()?;
        let include = request.resolved_include();
        let response = self
            .engine
            .get_items(
                self.name(),
                GetItemsRequest {
                    ids: request.ids,
                    filter: request.filter,
                    where_document: request.where_document,
                    include: Some(include.clone()),
                    limit: request.limit,
                    offset: request.offset,
                },
            )
            .await?;
        GetResult::from_response(response, &include)
    }

    /// Nearest-neighbour search. `query_texts` are embedded in one batch
    /// before the engine is called.
    #[instrument(skip_all, fields(collection = %self.record.name, queries = request.len()))]
    pub async fn query(&self, request: QueryItems) -> Result<QueryResult> {
        request.validate()?;
        if request.query_texts.is_some() {
            self.ensure_embedder()?;
        }
        let include = request.resolved_include();
        let queries = request.len();

        let query_embeddings = match (request.query_embeddings, request.query_texts) {
            (Some(vectors), _) => vectors,
            (None, Some(texts)) => self.embed(&texts).await?,
            (None, None) => return Err(Error::contract("query needs query_embeddings or query_texts")),
        };

        debug!("sending query to engine");
        let response = self
            .engine
            .query(
                self.name(),
                QueryRequest {
                    query_embeddings: Some(query_embeddings),
                    query_texts: None,
                    filter: request.filter,
                    where_document: request.where_document,
                    n_results: Some(request.n_results.unwrap_or(crate::request::DEFAULT_N_RESULTS)),
                    include: Some(include.clone()),
                },
            )
            .await?;
        QueryResult::from_response(response, &include, queries)
    }

    /// Replaces columns of existing rows; returns how many rows changed.
    ///
    /// New `documents` without explicit embeddings are re-embedded and need
    /// a provider.
    #[instrument(skip_all, fields(collection = %self.record.name, count = items.ids.len()))]
    pub async fn update(&self, mut items: UpdateItems) -> Result<u64> {
        items.validate()?;
        let embeddings = match (items.embeddings.take(), &items.documents) {
            (Some(vectors), _) => Some(vectors),
            (None, Some(documents)) => {
                self.ensure_embedder()?;
                Some(self.embed(documents).await?)
            }
            (None, None) => None,
        };

        let affected = self
            .engine
            .update_items(
                self.name(),
                UpdateItemsRequest {
                    ids: items.ids,
                    embeddings,
                    documents: items.documents,
                    metadatas: items.metadatas,
                },
            )
            .await?;
        Ok(affected.affected_rows)
    }

    /// Deletes rows by id and/or filter; returns how many rows went away.
    ///
    /// With a filter, matching ids are resolved first and only those are
    /// deleted. Nothing is sent when no row matches.
    #[instrument(skip_all, fields(collection = %self.record.name))]
    pub async fn delete(&self, request: DeleteItems) -> Result<u64> {
        request.validate()?;
        let ids = if request.ids_only() {
            request.ids.unwrap_or_default()
        } else {
            let matched = self
                .engine
                .get_items(
                    self.name(),
                    GetItemsRequest {
                        ids: request.ids,
                        filter: request.filter,
                        where_document: request.where_document,
                        include: Some(Vec::new()),
                        ..Default::default()
                    },
                )
                .await?;
            matched.ids
        };

        if ids.is_empty() {
            debug!("no rows matched");
            return Ok(0);
        }
        let affected = self
            .engine
            .delete_items(self.name(), DeleteItemsRequest { ids })
            .await?;
        Ok(affected.affected_rows)
    }

    /// Number of rows in the collection.
    #[instrument(skip_all, fields(collection = %self.record.name))]
    pub async fn count(&self) -> Result<usize> {
        let response = self
            .engine
            .get_items(
                self.name(),
                GetItemsRequest {
                    include: Some(Vec::new()),
                    ..Default::default()
                },
            )
            .await?;
        Ok(response.ids.len())
    }

    /// The first `limit` rows with documents and metadatas.
    pub async fn peek(&self, limit: i64) -> Result<GetResult> {
        self.get(GetItems::new().with_limit(limit)).await
    }

    fn ensure_embedder(&self) -> Result<&Arc<dyn EmbeddingFunction>> {
        self.embedder.as_ref().ok_or_else(|| {
            Error::contract(format!(
                "collection '{}' has no embedding provider; pass embeddings instead of text",
                self.record.name
            ))
        })
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let embedder = self.ensure_embedder()?;
        debug!(count = texts.len(), "generating embeddings");
        let vectors = embedder.embed(texts).await?;
        if vectors.len() != texts.len() {
            return Err(Error::provider(format!(
                "embedding function returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }
}
