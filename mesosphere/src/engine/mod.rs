//! Vector engines: the data side of a [`Client`](crate::Client).
//!
//! [`HttpEngine`] talks to a remote collection API. [`MemoryEngine`] keeps
//! everything in process and evaluates filters with the same rules the
//! remote engine is expected to follow; it backs tests, demos and the
//! development server.

mod http;
mod memory;

pub use http::HttpEngine;
pub use memory::MemoryEngine;

use async_trait::async_trait;

use crate::protocol::{
    AddItemsRequest, AddItemsResponse, AffectedRows, CollectionRecord, CreateCollectionRequest,
    DeleteItemsRequest, GetItemsRequest, GetItemsResponse, QueryRequest, QueryResponse,
    UpdateItemsRequest,
};
use crate::Result;

/// Storage and search for named collections.
///
/// Requests reaching an engine are already validated by the collection
/// handle; engines still reject what they cannot honor.
#[async_trait]
pub trait VectorEngine: Send + Sync {
    async fn create_collection(&self, request: CreateCollectionRequest) -> Result<CollectionRecord>;

    async fn get_collection(&self, name: &str) -> Result<CollectionRecord>;

    async fn list_collections(&self) -> Result<Vec<CollectionRecord>>;

    async fn delete_collection(&self, name: &str) -> Result<AffectedRows>;

    async fn add_items(&self, collection: &str, request: AddItemsRequest) -> Result<AddItemsResponse>;

    async fn get_items(&self, collection: &str, request: GetItemsRequest) -> Result<GetItemsResponse>;

    async fn update_items(&self, collection: &str, request: UpdateItemsRequest) -> Result<AffectedRows>;

    async fn delete_items(&self, collection: &str, request: DeleteItemsRequest) -> Result<AffectedRows>;

    async fn query(&self, collection: &str, request: QueryRequest) -> Result<QueryResponse>;
}
