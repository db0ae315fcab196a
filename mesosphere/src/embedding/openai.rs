use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{check_batch, Dimension, EmbeddingFunction};
use crate::{Embedding, Error, Result};

pub(crate) const API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Embeddings from the OpenAI `/embeddings` endpoint, or any server that
/// speaks the same protocol.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedding {
    model: String,
    base_url: String,
    api_key: String,
    organization: Option<String>,
    project: Option<String>,
    dimension: Dimension,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Embedding,
}

impl OpenAiEmbedding {
    pub fn new<K: Into<String>>(api_key: K, model: &str, base_url: &str) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::contract("OpenAI api_key must be non-empty"));
        }
        let mut provider = Self {
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            organization: None,
            project: None,
            dimension: Dimension::default(),
            client: reqwest::Client::new(),
        };
        provider.client = provider.build_client(DEFAULT_TIMEOUT)?;
        Ok(provider)
    }

    pub fn with_organization<S: Into<String>>(mut self, organization: S) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_project<S: Into<String>>(mut self, project: S) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Rejects batches whose vectors are not `dimension` wide.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Dimension::new(Some(dimension));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = self.build_client(timeout)?;
        Ok(self)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_client(&self, timeout: Duration) -> Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| Error::contract("OpenAI api_key contains invalid header characters"))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::provider(format!("cannot build OpenAI HTTP client: {e}")))
    }
}

#[async_trait]
impl EmbeddingFunction for OpenAiEmbedding {
    #[instrument(skip(self, texts), fields(model = %self.model, count = texts.len()))]
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .json(&EmbeddingsRequest {
                model: &self.model,
                input: texts,
            });
        if let Some(organization) = &self.organization {
            request = request.header("OpenAI-Organization", organization);
        }
        if let Some(project) = &self.project {
            request = request.header("OpenAI-Project", project);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::provider(format!("OpenAI request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider(format!(
                "OpenAI returned {status} for model '{}': {body}",
                self.model
            )));
        }

        let body: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| Error::provider(format!("malformed OpenAI response: {e}")))?;
        let vectors = into_input_order(body.data, texts.len())?;
        check_batch("openai", texts.len(), &vectors)?;
        self.dimension.check("openai", &vectors)?;
        debug!(dimension = vectors[0].len(), "embedded batch");
        Ok(vectors)
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension.get()
    }
}

/// Places each returned vector at its `index`.
fn into_input_order(mut data: Vec<EmbeddingData>, inputs: usize) -> Result<Vec<Embedding>> {
    data.sort_by_key(|d| d.index);
    for (position, item) in data.iter().enumerate() {
        if item.index != position || position >= inputs {
            return Err(Error::provider(format!(
                "OpenAI returned an unexpected embedding index {}",
                item.index
            )));
        }
    }
    Ok(data.into_iter().map(|d| d.embedding).collect())
}
