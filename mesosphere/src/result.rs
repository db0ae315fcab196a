//! Results returned by [`Collection`](crate::Collection) reads.

use serde::{Deserialize, Serialize};

use crate::protocol::{GetItemsResponse, QueryResponse};
use crate::{Error, Include, Metadata, Result};

/// Flat, index-aligned rows from `get`.
///
/// `documents` and `metadatas` are present only when requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetResult {
    pub ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<Option<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadatas: Option<Vec<Option<Metadata>>>,
}

impl GetResult {
    /// Keeps the requested columns and checks they line up with `ids`.
    pub(crate) fn from_response(response: GetItemsResponse, include: &[Include]) -> Result<Self> {
        let n = response.ids.len();
        let documents = include
            .contains(&Include::Documents)
            .then(|| aligned("documents", response.documents, n))
            .transpose()?;
        let metadatas = include
            .contains(&Include::Metadatas)
            .then(|| aligned("metadatas", response.metadatas, n))
            .transpose()?;
        Ok(Self {
            ids: response.ids,
            documents,
            metadatas,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Nested results from `query`: one outer entry per query, nearest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub ids: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadatas: Option<Vec<Vec<Option<Metadata>>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distances: Option<Vec<Vec<f64>>>,
}

impl QueryResult {
    pub(crate) fn from_response(
        response: QueryResponse,
        include: &[Include],
        queries: usize,
    ) -> Result<Self> {
        if response.ids.len() != queries {
            return Err(Error::InvalidResponse(format!(
                "engine answered {} queries, expected {queries}",
                response.ids.len()
            )));
        }
        let shape: Vec<usize> = response.ids.iter().map(Vec::len).collect();

        let documents = include
            .contains(&Include::Documents)
            .then(|| nested("documents", response.documents, &shape))
            .transpose()?;
        let metadatas = include
            .contains(&Include::Metadatas)
            .then(|| nested("metadatas", response.metadatas, &shape))
            .transpose()?;
        let distances = include
            .contains(&Include::Distances)
            .then(|| nested("distances", response.distances, &shape))
            .transpose()?;

        Ok(Self {
            ids: response.ids,
            documents,
            metadatas,
            distances,
        })
    }

    /// Number of queries answered.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Matches of query `index`, nearest first.
    pub fn matches(&self, index: usize) -> Vec<QueryMatch> {
        let Some(ids) = self.ids.get(index) else {
            return Vec::new();
        };
        ids.iter()
            .enumerate()
            .map(|(rank, id)| QueryMatch {
                id: id.clone(),
                document: cell(&self.documents, index, rank).cloned().flatten(),
                metadata: cell(&self.metadatas, index, rank).cloned().flatten(),
                distance: cell(&self.distances, index, rank).copied(),
            })
            .collect()
    }
}

/// Entry `rank` of query `index`; `None` when the column is absent or short.
fn cell<T>(column: &Option<Vec<Vec<T>>>, index: usize, rank: usize) -> Option<&T> {
    column
        .as_ref()
        .and_then(|rows| rows.get(index))
        .and_then(|row| row.get(rank))
}

/// One neighbour of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    pub id: String,
    pub document: Option<String>,
    pub metadata: Option<Metadata>,
    pub distance: Option<f64>,
}

fn aligned<T>(column: &str, values: Option<Vec<T>>, expected: usize) -> Result<Vec<T>> {
    let values = values.ok_or_else(|| {
        Error::InvalidResponse(format!("engine omitted requested column '{column}'"))
    })?;
    if values.len() != expected {
        return Err(Error::InvalidResponse(format!(
            "column '{column}' has {} entries for {expected} ids",
            values.len()
        )));
    }
    Ok(values)
}

fn nested<T>(column: &str, values: Option<Vec<Vec<T>>>, shape: &[usize]) -> Result<Vec<Vec<T>>> {
    let values = aligned(column, values, shape.len())?;
    for (query, (inner, expected)) in values.iter().zip(shape).enumerate() {
        if inner.len() != *expected {
            return Err(Error::InvalidResponse(format!(
                "column '{column}' has {} entries for {expected} ids in query {query}",
                inner.len()
            )));
        }
    }
    Ok(values)
}
