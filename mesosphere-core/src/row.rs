//! Rows and embeddings.

use serde::{Deserialize, Serialize};

use crate::filter::{matches_vector_filters, DocumentFilter, Where};
use crate::metadata::Metadata;

/// A dense embedding vector.
///
/// All vectors sent in one request must share a dimensionality; the remote
/// engine enforces this, not the client.
pub type Embedding = Vec<f32>;

/// A single item of a collection as seen by filters.
///
/// `document` and `metadata` may each be absent independently. The `id` is
/// fixed once the row has been added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: String,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl Row {
    /// Creates a row with only an id.
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            document: None,
            metadata: None,
        }
    }

    /// Sets the document text. Chainable.
    pub fn with_document<S: Into<String>>(mut self, document: S) -> Self {
        self.document = Some(document.into());
        self
    }

    /// Sets the metadata. Chainable.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Returns true if the row satisfies both filters. Absent filters match.
    #[inline]
    pub fn matches(&self, filter: Option<&Where>, document_filter: Option<&DocumentFilter>) -> bool {
        matches_vector_filters(self, filter, document_filter)
    }
}
