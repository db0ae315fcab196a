//! Request builders for [`Collection`](crate::Collection) operations.
//!
//! Each builder only records intent. Validation happens when the request is
//! handed to the collection, before anything leaves the process.

use std::collections::HashSet;

use crate::{DocumentFilter, Embedding, Error, Include, Metadata, Result, Where};

/// Rows to add. Supply `embeddings`, or `documents` for the configured
/// provider to embed. Explicit embeddings win when both are given.
///
/// ```
/// use mesosphere::{AddItems, Metadata};
///
/// let items = AddItems::new(["id1"])
///     .with_documents(["hello world"])
///     .with_metadatas(vec![Metadata::new().with_field("tag", "a")]);
/// assert_eq!(items.ids, vec!["id1"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddItems {
    pub ids: Vec<String>,
    pub embeddings: Option<Vec<Embedding>>,
    pub documents: Option<Vec<String>>,
    pub metadatas: Option<Vec<Metadata>>,
}

impl AddItems {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: collect_strings(ids),
            ..Default::default()
        }
    }

    pub fn with_embeddings(mut self, embeddings: Vec<Embedding>) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    pub fn with_documents<I, S>(mut self, documents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.documents = Some(collect_strings(documents));
        self
    }

    pub fn with_metadatas(mut self, metadatas: Vec<Metadata>) -> Self {
        self.metadatas = Some(metadatas);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_ids(&self.ids)?;
        let n = self.ids.len();
        check_len("embeddings", self.embeddings.as_ref().map(Vec::len), n)?;
        check_len("documents", self.documents.as_ref().map(Vec::len), n)?;
        check_len("metadatas", self.metadatas.as_ref().map(Vec::len), n)?;
        if let Some(embeddings) = &self.embeddings {
            validate_vectors("embeddings", embeddings)?;
        } else if self.documents.is_none() {
            return Err(Error::contract("add needs embeddings or documents"));
        }
        validate_metadatas(self.metadatas.as_deref())
    }
}

/// A flat read of a collection.
///
/// ```
/// use mesosphere::{GetItems, Include, Where};
///
/// let request = GetItems::new()
///     .with_where(Where::field("tag").eq("a"))
///     .with_include([Include::Documents])
///     .with_limit(10);
/// assert_eq!(request.limit, Some(10));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetItems {
    pub ids: Option<Vec<String>>,
    pub filter: Option<Where>,
    pub where_document: Option<DocumentFilter>,
    /// Columns to return next to ids; documents and metadatas when unset.
    pub include: Option<Vec<Include>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl GetItems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = Some(collect_strings(ids));
        self
    }

    pub fn with_where(mut self, filter: Where) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_where_document(mut self, filter: DocumentFilter) -> Self {
        self.where_document = Some(filter);
        self
    }

    pub fn with_include<I: IntoIterator<Item = Include>>(mut self, include: I) -> Self {
        self.include = Some(include.into_iter().collect());
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(ids) = &self.ids {
            validate_ids(ids)?;
        }
        if self
            .include
            .as_deref()
            .is_some_and(|include| include.contains(&Include::Distances))
        {
            return Err(Error::contract("distances can only be included in queries"));
        }
        Ok(())
    }

    pub(crate) fn resolved_include(&self) -> Vec<Include> {
        self.include
            .clone()
            .unwrap_or_else(|| Include::GET_DEFAULT.to_vec())
    }
}

/// A nearest-neighbour search. Exactly one of `query_embeddings` and
/// `query_texts` must be set.
///
/// ```
/// use mesosphere::QueryItems;
///
/// let by_text = QueryItems::texts(["hello"]).with_n_results(1);
/// let by_vector = QueryItems::embeddings(vec![vec![0.1, 0.2]]);
/// assert!(by_text.query_embeddings.is_none());
/// assert!(by_vector.query_texts.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryItems {
    pub query_embeddings: Option<Vec<Embedding>>,
    pub query_texts: Option<Vec<String>>,
    pub filter: Option<Where>,
    pub where_document: Option<DocumentFilter>,
    /// Neighbours per query; 10 when unset.
    pub n_results: Option<usize>,
    /// Columns to return next to ids; all three when unset.
    pub include: Option<Vec<Include>>,
}

pub const DEFAULT_N_RESULTS: usize = 10;

impl QueryItems {
    pub fn embeddings(query_embeddings: Vec<Embedding>) -> Self {
        Self {
            query_embeddings: Some(query_embeddings),
            ..Default::default()
        }
    }

    pub fn texts<I, S>(query_texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            query_texts: Some(collect_strings(query_texts)),
            ..Default::default()
        }
    }

    pub fn with_query_embeddings(mut self, query_embeddings: Vec<Embedding>) -> Self {
        self.query_embeddings = Some(query_embeddings);
        self
    }

    pub fn with_query_texts<I, S>(mut self, query_texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query_texts = Some(collect_strings(query_texts));
        self
    }

    pub fn with_where(mut self, filter: Where) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_where_document(mut self, filter: DocumentFilter) -> Self {
        self.where_document = Some(filter);
        self
    }

    pub fn with_n_results(mut self, n_results: usize) -> Self {
        self.n_results = Some(n_results);
        self
    }

    pub fn with_include<I: IntoIterator<Item = Include>>(mut self, include: I) -> Self {
        self.include = Some(include.into_iter().collect());
        self
    }

    /// Number of queries in the request.
    pub fn len(&self) -> usize {
        match (&self.query_embeddings, &self.query_texts) {
            (Some(vectors), _) => vectors.len(),
            (None, Some(texts)) => texts.len(),
            (None, None) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match (&self.query_embeddings, &self.query_texts) {
            (Some(_), Some(_)) => {
                return Err(Error::contract(
                    "query takes query_embeddings or query_texts, not both",
                ))
            }
            (None, None) => {
                return Err(Error::contract("query needs query_embeddings or query_texts"))
            }
            (Some(vectors), None) => {
                if vectors.is_empty() {
                    return Err(Error::contract("query_embeddings must be non-empty"));
                }
                validate_vectors("query_embeddings", vectors)?;
            }
            (None, Some(texts)) => {
                if texts.is_empty() {
                    return Err(Error::contract("query_texts must be non-empty"));
                }
            }
        }
        if self.n_results == Some(0) {
            return Err(Error::contract("n_results must be a positive integer"));
        }
        Ok(())
    }

    pub(crate) fn resolved_include(&self) -> Vec<Include> {
        self.include
            .clone()
            .unwrap_or_else(|| Include::QUERY_DEFAULT.to_vec())
    }
}

/// Replacement values for existing rows.
///
/// `documents` given without `embeddings` are re-embedded, which needs an
/// embedding provider on the collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateItems {
    pub ids: Vec<String>,
    pub embeddings: Option<Vec<Embedding>>,
    pub documents: Option<Vec<String>>,
    pub metadatas: Option<Vec<Metadata>>,
}

impl UpdateItems {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: collect_strings(ids),
            ..Default::default()
        }
    }

    pub fn with_embeddings(mut self, embeddings: Vec<Embedding>) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    pub fn with_documents<I, S>(mut self, documents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.documents = Some(collect_strings(documents));
        self
    }

    pub fn with_metadatas(mut self, metadatas: Vec<Metadata>) -> Self {
        self.metadatas = Some(metadatas);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_ids(&self.ids)?;
        if self.embeddings.is_none() && self.documents.is_none() && self.metadatas.is_none() {
            return Err(Error::contract(
                "update needs at least one of embeddings, documents or metadatas",
            ));
        }
        let n = self.ids.len();
        check_len("embeddings", self.embeddings.as_ref().map(Vec::len), n)?;
        check_len("documents", self.documents.as_ref().map(Vec::len), n)?;
        check_len("metadatas", self.metadatas.as_ref().map(Vec::len), n)?;
        if let Some(embeddings) = &self.embeddings {
            validate_vectors("embeddings", embeddings)?;
        }
        validate_metadatas(self.metadatas.as_deref())
    }
}

/// Rows to remove, by id, by filter, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteItems {
    pub ids: Option<Vec<String>>,
    pub filter: Option<Where>,
    pub where_document: Option<DocumentFilter>,
}

impl DeleteItems {
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: Some(collect_strings(ids)),
            ..Default::default()
        }
    }

    pub fn matching(filter: Where) -> Self {
        Self {
            filter: Some(filter),
            ..Default::default()
        }
    }

    pub fn with_where(mut self, filter: Where) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_where_document(mut self, filter: DocumentFilter) -> Self {
        self.where_document = Some(filter);
        self
    }

    /// True when no filter narrows the id list.
    pub(crate) fn ids_only(&self) -> bool {
        self.filter.is_none() && self.where_document.is_none()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.ids.is_none() && self.ids_only() {
            return Err(Error::contract(
                "delete needs ids, where or where_document",
            ));
        }
        if let Some(ids) = &self.ids {
            validate_ids(ids)?;
        }
        Ok(())
    }
}

fn collect_strings<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

/// Non-empty, non-blank and unique.
pub(crate) fn validate_ids(ids: &[String]) -> Result<()> {
    if ids.is_empty() {
        return Err(Error::contract("ids must be a non-empty list"));
    }
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if id.trim().is_empty() {
            return Err(Error::contract("ids must be non-empty strings"));
        }
        if !seen.insert(id.as_str()) {
            return Err(Error::contract(format!("duplicate id '{id}' in request")));
        }
    }
    Ok(())
}

fn check_len(column: &str, len: Option<usize>, expected: usize) -> Result<()> {
    match len {
        Some(len) if len != expected => Err(Error::contract(format!(
            "{column} has {len} entries but ids has {expected}"
        ))),
        _ => Ok(()),
    }
}

fn validate_vectors(column: &str, vectors: &[Embedding]) -> Result<()> {
    if let Some(position) = vectors.iter().position(|v| v.is_empty()) {
        return Err(Error::contract(format!(
            "{column}[{position}] is an empty vector"
        )));
    }
    Ok(())
}

fn validate_metadatas(metadatas: Option<&[Metadata]>) -> Result<()> {
    metadatas
        .unwrap_or_default()
        .iter()
        .try_for_each(Metadata::ensure_scalar)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_length_mismatch() {
        let items = AddItems::new(["x", "y"])
            .with_embeddings(vec![vec![1.0], vec![2.0]])
            .with_metadatas(vec![Metadata::new()]);
        assert!(items.validate().unwrap_err().is_contract_violation());
    }

    #[test]
    fn test_add_needs_vectors_or_text() {
        assert!(AddItems::new(["x"]).validate().is_err());
        assert!(AddItems::new(["x"]).with_documents(["doc"]).validate().is_ok());
        assert!(AddItems::new(["x"])
            .with_embeddings(vec![vec![0.5]])
            .validate()
            .is_ok());
    }

    #[test]
    fn test_ids_rules() {
        assert!(validate_ids(&[]).is_err());
        assert!(validate_ids(&["".to_string()]).is_err());
        assert!(validate_ids(&["a".to_string(), "a".to_string()]).is_err());
        assert!(validate_ids(&["a".to_string(), "b".to_string()]).is_ok());
    }

    #[test]
    fn test_add_rejects_nested_metadata() {
        let nested = Metadata::new().with_field("tags", serde_json::json!(["a", "b"]));
        let items = AddItems::new(["x"])
            .with_documents(["doc"])
            .with_metadatas(vec![nested]);
        assert!(items.validate().is_err());
    }

    #[test]
    fn test_get_rejects_distances() {
        let request = GetItems::new().with_include([Include::Distances]);
        assert!(request.validate().is_err());
        assert_eq!(GetItems::new().resolved_include(), Include::GET_DEFAULT.to_vec());
    }

    #[test]
    fn test_query_exactly_one_input() {
        let both = QueryItems::texts(["a"]).with_query_embeddings(vec![vec![1.0]]);
        assert!(both.validate().unwrap_err().is_contract_violation());
        assert!(QueryItems::default().validate().unwrap_err().is_contract_violation());
        assert!(QueryItems::texts(Vec::<String>::new()).validate().is_err());
        assert!(QueryItems::texts(["a"]).with_n_results(0).validate().is_err());
        assert!(QueryItems::embeddings(vec![vec![]]).validate().is_err());
        assert!(QueryItems::texts(["a"]).validate().is_ok());
    }

    #[test]
    fn test_update_needs_a_column() {
        assert!(UpdateItems::new(["x"]).validate().is_err());
        assert!(UpdateItems::new(["x"])
            .with_metadatas(vec![Metadata::new().with_field("v", 2)])
            .validate()
            .is_ok());
    }

    #[test]
    fn test_delete_needs_a_selector() {
        assert!(DeleteItems::default().validate().is_err());
        assert!(DeleteItems::ids(["x"]).validate().is_ok());
        assert!(DeleteItems::matching(Where::field("tag").eq("a")).validate().is_ok());
        assert!(DeleteItems::default()
            .with_where_document(DocumentFilter::contains("x"))
            .validate()
            .is_ok());
    }
}
