//! # Mesosphere
//!
//! **An async Rust client for remote vector collections.**
//!
//! Mesosphere resolves named collections on a vector API, adds and reads
//! rows, and runs nearest-neighbour queries. Text can stand in for vectors
//! when an embedding provider is configured:
//!
//! - **Filters** - `$eq`, `$gt`, `$in`, `$and`, `$or` over metadata, and
//!   `$contains` over document text
//! - **Providers** - Ollama, OpenAI, or an in-process BERT model
//! - **Engines** - the HTTP API, or an in-memory engine for tests and demos
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | **Collections** | Get-or-create, list, delete |
//! | **Rows** | Add, get, update, delete, count, peek |
//! | **Query** | Top-k by vector or by text, filtered |
//! | **Embeddings** | One batched provider call per operation |
//!
//! ## Quick Start
//!
//! ```no_run
//! use mesosphere::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ClientConfig::new("http://localhost:8000", "secret")
//!         .with_embedding(EmbeddingProviderConfig::ollama());
//!     let client = Client::new(config)?;
//!
//!     let docs = client.get_or_create_collection("docs", None).await?;
//!     docs.add(
//!         AddItems::new(["id1", "id2"])
//!             .with_documents(["hello world", "goodbye moon"])
//!             .with_metadatas(vec![
//!                 Metadata::new().with_field("tag", "a"),
//!                 Metadata::new().with_field("tag", "b"),
//!             ]),
//!     )
//!     .await?;
//!
//!     let hits = docs
//!         .query(QueryItems::texts(["hello"]).with_n_results(1))
//!         .await?;
//!     println!("{:?}", hits.ids);
//!     Ok(())
//! }
//! ```
//!
//! ### Filtering
//!
//! ```rust
//! use mesosphere::prelude::*;
//!
//! let filter = Where::field("year").gte(2020).and(Where::field("lang").is_in(vec!["en", "de"]));
//! let row = Row::new("a").with_metadata(
//!     Metadata::new().with_field("year", 2023).with_field("lang", "en"),
//! );
//! assert!(row.matches(Some(&filter), None));
//! ```
//!
//! ## Crate Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `local-model` | Enables [`LocalEmbedding`] via candle and the Hugging Face hub |
//!
//! ## Architecture
//!
//! - **`mesosphere-core`** - Filters, paging, distance metrics and wire
//!   models; no async runtime
//! - **`mesosphere`** - Client, collections, providers and engines; re-exports core
//!
//! ### Core Components
//!
//! - [`Client`] - Resolves collections
//! - [`Collection`] - Row operations on one collection
//! - [`EmbeddingFunction`] - Text to vectors
//! - [`engine::VectorEngine`] - The data seam ([`engine::HttpEngine`], [`engine::MemoryEngine`])
//! - [`Where`] / [`DocumentFilter`] - Filter expressions
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`](crate::Result). Caller
//! mistakes are [`Error::ContractViolation`] and are raised before any
//! network call. Nothing is retried.
//!
//! ## Concurrency
//!
//! [`Client`] and [`Collection`] are `Clone + Send + Sync`. Concurrent calls
//! are not ordered with respect to each other.

// Re-export everything from core
pub use mesosphere_core::*;

pub mod client;
pub mod collection;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod request;
pub mod result;

pub use client::Client;
pub use collection::Collection;
pub use config::ClientConfig;
pub use embedding::{
    EmbeddingFunction, EmbeddingProvider, EmbeddingProviderConfig, LocalDevice, LocalEmbedding,
    OllamaEmbedding, OpenAiEmbedding,
};
pub use request::{AddItems, DeleteItems, GetItems, QueryItems, UpdateItems};
pub use result::{GetResult, QueryMatch, QueryResult};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        AddItems, Client, ClientConfig, Collection, DeleteItems, DistanceMetric, DocumentFilter,
        Embedding, EmbeddingFunction, EmbeddingProviderConfig, Error, GetItems, GetResult,
        Include, Metadata, QueryItems, QueryResult, Result, Row, UpdateItems, Where,
    };
}
