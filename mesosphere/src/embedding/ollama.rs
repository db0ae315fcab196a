use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{check_batch, Dimension, EmbeddingFunction};
use crate::{Embedding, Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Embeddings from an Ollama server.
///
/// The whole batch is sent in a single `POST {base_url}/api/embed`.
#[derive(Debug, Clone)]
pub struct OllamaEmbedding {
    model: String,
    base_url: String,
    dimension: Dimension,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Embedding>,
}

impl OllamaEmbedding {
    pub fn new(model: &str, base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::provider(format!("cannot build Ollama HTTP client: {e}")))?;
        Ok(Self {
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            dimension: Dimension::default(),
            client,
        })
    }

    /// Rejects batches whose vectors are not `dimension` wide.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Dimension::new(Some(dimension));
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl EmbeddingFunction for OllamaEmbedding {
    #[instrument(skip(self, texts), fields(model = %self.model, count = texts.len()))]
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/embed", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| Error::provider(format!("cannot reach Ollama at {}: {e}", self.base_url)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider(format!(
                "Ollama returned {status} for model '{}': {body}",
                self.model
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::provider(format!("malformed Ollama response: {e}")))?;
        check_batch("ollama", texts.len(), &body.embeddings)?;
        self.dimension.check("ollama", &body.embeddings)?;
        debug!(dimension = body.embeddings[0].len(), "embedded batch");
        Ok(body.embeddings)
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension.get()
    }
}
