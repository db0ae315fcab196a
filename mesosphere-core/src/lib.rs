//! # Mesosphere Core
//!
//! Runtime-free building blocks for the Mesosphere vector collection client.
//!
//! Nothing in this crate performs I/O. It decides *what* a request means and
//! how locally available rows are judged against it:
//!
//! ## Filtering
//!
//! - [`Where`] - Metadata filter expressions (`$eq`, `$gt`, `$in`, `$and`, `$or`, ...)
//! - [`DocumentFilter`] - `$contains` / `$not_contains` over document text
//! - [`matches_vector_filters`] - Conjunction of both over a [`Row`]
//!
//! ## Results
//!
//! - [`paging::page`] - Offset/limit windows
//! - [`DistanceMetric`] - Distance functions for exact ranking
//!
//! ## Protocol
//!
//! - [`protocol`] - Request and response bodies of the collection API
//!
//! ## Types
//!
//! - [`Row`] - Id, optional document, optional metadata
//! - [`Metadata`] - Flat scalar metadata
//! - [`Embedding`] - A dense `f32` vector

pub mod distance;
pub mod error;
pub mod filter;
pub mod metadata;
pub mod paging;
pub mod protocol;
pub mod row;

// Re-exports for convenient access
pub use distance::DistanceMetric;
pub use error::{Error, Result};
pub use filter::{
    matches_vector_filters, matches_where, matches_where_document, Condition, DocumentFilter,
    Where,
};
pub use metadata::Metadata;
pub use protocol::Include;
pub use row::{Embedding, Row};

/// Re-export commonly used types for convenience.
///
/// # Example
///
/// ```rust
/// use mesosphere_core::prelude::*;
///
/// let row = Row::new("id1").with_metadata(Metadata::new().with_field("tag", "a"));
/// assert!(row.matches(Some(&Where::field("tag").eq("a")), None));
/// ```
pub mod prelude {
    pub use crate::{
        DistanceMetric, DocumentFilter, Embedding, Error, Include, Metadata, Result, Row, Where,
    };
}
