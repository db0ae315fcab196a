//! Entry point: resolves collections against an engine.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::collection::Collection;
use crate::config::ClientConfig;
use crate::embedding::{EmbeddingFunction, EmbeddingProvider};
use crate::engine::{HttpEngine, VectorEngine};
use crate::protocol::CreateCollectionRequest;
use crate::{Error, Metadata, Result};

/// Client for a vector collection API.
///
/// Cheap to clone; clones share the engine and the embedding provider.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use mesosphere::engine::MemoryEngine;
/// use mesosphere::{AddItems, Client, GetItems, Metadata, Where};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> mesosphere::Result<()> {
/// let client = Client::with_engine(Arc::new(MemoryEngine::new()));
/// let docs = client.get_or_create_collection("docs", None).await?;
///
/// docs.add(
///     AddItems::new(["id1"])
///         .with_embeddings(vec![vec![0.1, 0.9]])
///         .with_documents(["hello world"])
///         .with_metadatas(vec![Metadata::new().with_field("tag", "a")]),
/// )
/// .await?;
///
/// let found = docs.get(GetItems::new().with_where(Where::field("tag").eq("a"))).await?;
/// assert_eq!(found.ids, vec!["id1"]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    engine: Arc<dyn VectorEngine>,
    embedder: Option<Arc<dyn EmbeddingFunction>>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("has_embedding_function", &self.embedder.is_some())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Connects to the remote API described by `config`.
    ///
    /// No request is made here; bad settings surface as
    /// [`Error::ContractViolation`].
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let engine = HttpEngine::new(&config.api_url, &config.api_key, config.timeout)?;
        let embedder = match &config.embedding {
            Some(provider) => {
                let provider = EmbeddingProvider::from_config(provider)?;
                debug!(provider = provider.name(), "configured embedding provider");
                Some(Arc::new(provider) as Arc<dyn EmbeddingFunction>)
            }
            None => None,
        };
        Ok(Self {
            engine: Arc::new(engine),
            embedder,
        })
    }

    /// [`ClientConfig::from_env`] followed by [`Client::new`].
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Uses `engine` directly, without an embedding provider.
    pub fn with_engine(engine: Arc<dyn VectorEngine>) -> Self {
        Self {
            engine,
            embedder: None,
        }
    }

    /// Replaces the embedding provider. Chainable.
    pub fn with_embedding_function(mut self, embedder: Arc<dyn EmbeddingFunction>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn has_embedding_function(&self) -> bool {
        self.embedder.is_some()
    }

    pub fn engine(&self) -> &Arc<dyn VectorEngine> {
        &self.engine
    }

    /// Creates a collection; fails with [`Error::AlreadyExists`] if the name
    /// is taken.
    #[instrument(skip(self, metadata))]
    pub async fn create_collection(
        &self,
        name: &str,
        metadata: Option<Metadata>,
    ) -> Result<Collection> {
        let request = create_request(name, metadata)?;
        let record = self.engine.create_collection(request).await?;
        Ok(self.handle(record))
    }

    /// Fetches an existing collection; fails with [`Error::NotFound`].
    #[instrument(skip(self))]
    pub async fn get_collection(&self, name: &str) -> Result<Collection> {
        validate_name(name)?;
        let record = self.engine.get_collection(name).await?;
        Ok(self.handle(record))
    }

    /// Returns the named collection, creating it when missing.
    ///
    /// `metadata` only applies on creation; an existing collection keeps its
    /// own.
    #[instrument(skip(self, metadata))]
    pub async fn get_or_create_collection(
        &self,
        name: &str,
        metadata: Option<Metadata>,
    ) -> Result<Collection> {
        let request = create_request(name, metadata)?;
        match self.engine.get_collection(name).await {
            Ok(record) => return Ok(self.handle(record)),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        debug!("collection missing, creating");
        match self.engine.create_collection(request).await {
            Ok(record) => Ok(self.handle(record)),
            Err(Error::AlreadyExists(_)) => {
                debug!("lost creation race, fetching");
                let record = self.engine.get_collection(name).await?;
                Ok(self.handle(record))
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    pub async fn list_collections(&self) -> Result<Vec<Collection>> {
        let records = self.engine.list_collections().await?;
        Ok(records.into_iter().map(|r| self.handle(r)).collect())
    }

    #[instrument(skip(self))]
    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        self.engine.delete_collection(name).await?;
        Ok(())
    }

    fn handle(&self, record: crate::protocol::CollectionRecord) -> Collection {
        Collection::new(record, Arc::clone(&self.engine), self.embedder.clone())
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::contract("collection name must be a non-empty string"));
    }
    Ok(())
}

fn create_request(name: &str, metadata: Option<Metadata>) -> Result<CreateCollectionRequest> {
    validate_name(name)?;
    let metadata = metadata.unwrap_or_default();
    metadata.ensure_scalar()?;
    Ok(CreateCollectionRequest {
        name: name.to_string(),
        metadata: Some(metadata),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryEngine;

    fn client() -> Client {
        Client::with_engine(Arc::new(MemoryEngine::new()))
    }

    #[test]
    fn test_new_validates_config() {
        let err = Client::new(ClientConfig::new("http://localhost:8000", "")).unwrap_err();
        assert!(err.is_contract_violation());
        assert!(Client::new(ClientConfig::new("http://localhost:8000", "key")).is_ok());
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let client = client();
        let first = client
            .get_or_create_collection("docs", Some(Metadata::new().with_field("owner", "me")))
            .await
            .unwrap();
        let second = client
            .get_or_create_collection("docs", Some(Metadata::new().with_field("owner", "you")))
            .await
            .unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(second.metadata().get_str("owner"), Some("me"));
        assert!(!second.created_at().is_empty());
    }

    #[tokio::test]
    async fn test_get_or_create_defaults_to_empty_metadata() {
        let docs = client().get_or_create_collection("docs", None).await.unwrap();
        assert!(docs.metadata().is_empty());
    }

    #[tokio::test]
    async fn test_missing_collection_is_not_found() {
        let err = client().get_collection("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_create_twice_is_already_exists() {
        let client = client();
        client.create_collection("docs", None).await.unwrap();
        let err = client.create_collection("docs", None).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let client = client();
        client.create_collection("a", None).await.unwrap();
        client.create_collection("b", None).await.unwrap();
        let names: Vec<String> = client
            .list_collections()
            .await
            .unwrap()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);

        client.delete_collection("a").await.unwrap();
        assert_eq!(client.list_collections().await.unwrap().len(), 1);
        assert!(client.delete_collection("a").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let err = client().get_or_create_collection("  ", None).await.unwrap_err();
        assert!(err.is_contract_violation());
    }
}
