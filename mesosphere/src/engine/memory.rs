use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::VectorEngine;
use crate::paging::page;
use crate::protocol::{
    AddItemsRequest, AddItemsResponse, AffectedRows, CollectionRecord, CreateCollectionRequest,
    DeleteItemsRequest, GetItemsRequest, GetItemsResponse, Include, QueryRequest, QueryResponse,
    UpdateItemsRequest,
};
use crate::request::DEFAULT_N_RESULTS;
use crate::{DistanceMetric, Embedding, Error, Result, Row};

/// In-process engine with exact search.
///
/// Rows keep insertion order. A collection's dimension is fixed by its first
/// add. All operations are all-or-nothing: a rejected batch leaves the
/// collection untouched.
///
/// # Example
///
/// ```
/// use mesosphere::engine::{MemoryEngine, VectorEngine};
/// use mesosphere::protocol::CreateCollectionRequest;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let engine = MemoryEngine::new();
/// let record = engine
///     .create_collection(CreateCollectionRequest { name: "docs".into(), metadata: None })
///     .await
///     .unwrap();
/// assert_eq!(record.name, "docs");
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryEngine {
    metric: DistanceMetric,
    collections: RwLock<BTreeMap<String, StoredCollection>>,
}

#[derive(Debug)]
struct StoredCollection {
    record: CollectionRecord,
    dimension: Option<usize>,
    items: Vec<StoredItem>,
}

#[derive(Debug, Clone)]
struct StoredItem {
    row: Row,
    embedding: Embedding,
}

impl MemoryEngine {
    /// Creates an empty engine ranking by cosine distance.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metric(metric: DistanceMetric) -> Self {
        Self {
            metric,
            collections: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Number of rows stored in `collection`.
    pub fn len(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read();
        Ok(lookup(&collections, collection)?.items.len())
    }
}

fn lookup<'a>(
    collections: &'a BTreeMap<String, StoredCollection>,
    name: &str,
) -> Result<&'a StoredCollection> {
    collections
        .get(name)
        .ok_or_else(|| Error::NotFound(format!("collection '{name}' does not exist")))
}

fn lookup_mut<'a>(
    collections: &'a mut BTreeMap<String, StoredCollection>,
    name: &str,
) -> Result<&'a mut StoredCollection> {
    collections
        .get_mut(name)
        .ok_or_else(|| Error::NotFound(format!("collection '{name}' does not exist")))
}

fn check_column(column: &str, len: Option<usize>, expected: usize) -> Result<()> {
    match len {
        Some(len) if len != expected => Err(Error::contract(format!(
            "{column} has {len} entries but ids has {expected}"
        ))),
        _ => Ok(()),
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

impl StoredCollection {
    /// Checks every vector against the collection dimension, or against the
    /// first vector when the collection is still empty.
    fn check_dimensions<'a, I>(&self, vectors: I) -> Result<Option<usize>>
    where
        I: IntoIterator<Item = &'a Embedding>,
    {
        let mut expected = self.dimension;
        for vector in vectors {
            if vector.is_empty() {
                return Err(Error::contract("embeddings must be non-empty"));
            }
            match expected {
                Some(dim) if dim != vector.len() => {
                    return Err(Error::DimensionMismatch {
                        expected: dim,
                        got: vector.len(),
                    })
                }
                Some(_) => {}
                None => expected = Some(vector.len()),
            }
        }
        Ok(expected)
    }

    fn touch(&mut self) {
        self.record.updated_at = now();
    }
}

/// Projects rows onto the requested columns.
fn columns(
    rows: &[&StoredItem],
    include: &[Include],
) -> (
    Vec<String>,
    Option<Vec<Option<String>>>,
    Option<Vec<Option<crate::Metadata>>>,
) {
    let ids = rows.iter().map(|item| item.row.id.clone()).collect();
    let documents = include
        .contains(&Include::Documents)
        .then(|| rows.iter().map(|item| item.row.document.clone()).collect());
    let metadatas = include
        .contains(&Include::Metadatas)
        .then(|| rows.iter().map(|item| item.row.metadata.clone()).collect());
    (ids, documents, metadatas)
}

#[async_trait]
impl VectorEngine for MemoryEngine {
    async fn create_collection(&self, request: CreateCollectionRequest) -> Result<CollectionRecord> {
        if request.name.trim().is_empty() {
            return Err(Error::contract("collection name must be non-empty"));
        }
        let mut collections = self.collections.write();
        if collections.contains_key(&request.name) {
            return Err(Error::AlreadyExists(format!(
                "collection '{}' already exists",
                request.name
            )));
        }

        let timestamp = now();
        let record = CollectionRecord {
            id: Uuid::new_v4().to_string(),
            name: request.name.clone(),
            metadata: request.metadata,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        };
        collections.insert(
            request.name,
            StoredCollection {
                record: record.clone(),
                dimension: None,
                items: Vec::new(),
            },
        );
        debug!(name = %record.name, id = %record.id, "created collection");
        Ok(record)
    }

    async fn get_collection(&self, name: &str) -> Result<CollectionRecord> {
        let collections = self.collections.read();
        Ok(lookup(&collections, name)?.record.clone())
    }

    async fn list_collections(&self) -> Result<Vec<CollectionRecord>> {
        let collections = self.collections.read();
        Ok(collections.values().map(|c| c.record.clone()).collect())
    }

    async fn delete_collection(&self, name: &str) -> Result<AffectedRows> {
        let mut collections = self.collections.write();
        match collections.remove(name) {
            Some(_) => Ok(AffectedRows { affected_rows: 1 }),
            None => Err(Error::NotFound(format!("collection '{name}' does not exist"))),
        }
    }

    async fn add_items(&self, collection: &str, request: AddItemsRequest) -> Result<AddItemsResponse> {
        let mut collections = self.collections.write();
        let stored = lookup_mut(&mut collections, collection)?;

        let expected = request.ids.len();
        check_column("embeddings", Some(request.embeddings.len()), expected)?;
        check_column("documents", request.documents.as_ref().map(Vec::len), expected)?;
        check_column("metadatas", request.metadatas.as_ref().map(Vec::len), expected)?;
        let dimension = stored.check_dimensions(&request.embeddings)?;

        let mut seen: HashSet<&str> = stored.items.iter().map(|i| i.row.id.as_str()).collect();
        for id in &request.ids {
            if !seen.insert(id.as_str()) {
                return Err(Error::AlreadyExists(format!(
                    "id '{id}' already exists in '{collection}'"
                )));
            }
        }

        let mut documents = request.documents.map(Vec::into_iter);
        let mut metadatas = request.metadatas.map(Vec::into_iter);
        for (id, embedding) in request.ids.iter().zip(request.embeddings) {
            let row = Row {
                id: id.clone(),
                document: documents.as_mut().and_then(Iterator::next),
                metadata: metadatas.as_mut().and_then(Iterator::next),
            };
            stored.items.push(StoredItem { row, embedding });
        }
        stored.dimension = dimension;
        stored.touch();
        debug!(collection, count = expected, "added items");
        Ok(AddItemsResponse { ids: request.ids })
    }

    async fn get_items(&self, collection: &str, request: GetItemsRequest) -> Result<GetItemsResponse> {
        if request.include.as_deref().unwrap_or(&[]).contains(&Include::Distances) {
            return Err(Error::contract("distances can only be included in queries"));
        }
        let collections = self.collections.read();
        let stored = lookup(&collections, collection)?;

        let wanted: Option<HashSet<&str>> = request
            .ids
            .as_ref()
            .map(|ids| ids.iter().map(String::as_str).collect());
        let matching: Vec<&StoredItem> = stored
            .items
            .iter()
            .filter(|item| wanted.as_ref().map_or(true, |w| w.contains(item.row.id.as_str())))
            .filter(|item| item.row.matches(request.filter.as_ref(), request.where_document.as_ref()))
            .collect();
        let window = page(&matching, request.limit, request.offset);

        let include = request.include.as_deref().unwrap_or(&Include::GET_DEFAULT);
        let (ids, documents, metadatas) = columns(&window, include);
        Ok(GetItemsResponse {
            ids,
            documents,
            metadatas,
        })
    }

    async fn update_items(&self, collection: &str, request: UpdateItemsRequest) -> Result<AffectedRows> {
        let mut collections = self.collections.write();
        let stored = lookup_mut(&mut collections, collection)?;

        let expected = request.ids.len();
        check_column("embeddings", request.embeddings.as_ref().map(Vec::len), expected)?;
        check_column("documents", request.documents.as_ref().map(Vec::len), expected)?;
        check_column("metadatas", request.metadatas.as_ref().map(Vec::len), expected)?;
        let dimension = match &request.embeddings {
            Some(vectors) => stored.check_dimensions(vectors)?,
            None => stored.dimension,
        };

        let mut affected = 0;
        for (position, id) in request.ids.iter().enumerate() {
            let Some(item) = stored.items.iter_mut().find(|item| &item.row.id == id) else {
                continue;
            };
            if let Some(vectors) = &request.embeddings {
                item.embedding = vectors[position].clone();
            }
            if let Some(documents) = &request.documents {
                item.row.document = Some(documents[position].clone());
            }
            if let Some(metadatas) = &request.metadatas {
                item.row.metadata = Some(metadatas[position].clone());
            }
            affected += 1;
        }
        stored.dimension = dimension;
        if affected > 0 {
            stored.touch();
        }
        Ok(AffectedRows {
            affected_rows: affected,
        })
    }

    async fn delete_items(&self, collection: &str, request: DeleteItemsRequest) -> Result<AffectedRows> {
        let mut collections = self.collections.write();
        let stored = lookup_mut(&mut collections, collection)?;

        let doomed: HashSet<&str> = request.ids.iter().map(String::as_str).collect();
        let before = stored.items.len();
        stored.items.retain(|item| !doomed.contains(item.row.id.as_str()));
        let affected = (before - stored.items.len()) as u64;
        if affected > 0 {
            stored.touch();
        }
        Ok(AffectedRows {
            affected_rows: affected,
        })
    }

    async fn query(&self, collection: &str, request: QueryRequest) -> Result<QueryResponse> {
        let Some(queries) = request.query_embeddings else {
            return Err(Error::contract("this engine only accepts query_embeddings"));
        };
        let n_results = request.n_results.unwrap_or(DEFAULT_N_RESULTS);
        if n_results == 0 {
            return Err(Error::contract("n_results must be a positive integer"));
        }

        let collections = self.collections.read();
        let stored = lookup(&collections, collection)?;
        if stored.dimension.is_some() {
            stored.check_dimensions(&queries)?;
        }

        let candidates: Vec<&StoredItem> = stored
            .items
            .iter()
            .filter(|item| item.row.matches(request.filter.as_ref(), request.where_document.as_ref()))
            .collect();

        let include = request.include.as_deref().unwrap_or(&Include::QUERY_DEFAULT);
        let mut response = QueryResponse {
            ids: Vec::with_capacity(queries.len()),
            documents: include.contains(&Include::Documents).then(Vec::new),
            metadatas: include.contains(&Include::Metadatas).then(Vec::new),
            distances: include.contains(&Include::Distances).then(Vec::new),
        };

        for query in &queries {
            let mut scored: Vec<(f32, &StoredItem)> = candidates
                .iter()
                .map(|item| (self.metric.compute(query, &item.embedding), *item))
                .collect();
            scored.sort_by(|a, b| a.0.total_cmp(&b.0));
            scored.truncate(n_results);

            let rows: Vec<&StoredItem> = scored.iter().map(|(_, item)| *item).collect();
            let (ids, documents, metadatas) = columns(&rows, include);
            response.ids.push(ids);
            if let (Some(column), Some(values)) = (response.documents.as_mut(), documents) {
                column.push(values);
            }
            if let (Some(column), Some(values)) = (response.metadatas.as_mut(), metadatas) {
                column.push(values);
            }
            if let Some(column) = response.distances.as_mut() {
                column.push(scored.iter().map(|(d, _)| f64::from(*d)).collect());
            }
        }
        debug!(collection, queries = queries.len(), candidates = candidates.len(), "ran query");
        Ok(response)
    }
}
