//! Embedding providers.
//!
//! A provider turns a batch of texts into one vector per text, in order.
//! Three are built in:
//!
//! | Provider | Transport | Default model |
//! |----------|-----------|---------------|
//! | [`OllamaEmbedding`] | `POST {base_url}/api/embed` | `mxbai-embed-large` |
//! | [`OpenAiEmbedding`] | `POST {base_url}/embeddings` | `text-embedding-3-small` |
//! | [`LocalEmbedding`] | in-process BERT (feature `local-model`) | `sentence-transformers/all-MiniLM-L6-v2` |
//!
//! Anything else can be plugged in by implementing [`EmbeddingFunction`].

mod local;
mod ollama;
mod openai;

pub use local::{LocalDevice, LocalEmbedding};
pub use ollama::OllamaEmbedding;
pub use openai::OpenAiEmbedding;

use std::sync::OnceLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Embedding, Error, Result};

pub const DEFAULT_OLLAMA_MODEL: &str = "mxbai-embed-large";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LOCAL_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_LOCAL_MAX_LENGTH: usize = 256;

/// Turns texts into embeddings.
///
/// Implementations return exactly one non-empty vector per input, in input
/// order. An empty input yields an empty output.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use mesosphere::{Embedding, EmbeddingFunction, Result};
///
/// struct Lengths;
///
/// #[async_trait]
/// impl EmbeddingFunction for Lengths {
///     async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
///         Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
///     }
/// }
/// ```
#[async_trait]
pub trait EmbeddingFunction: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Vector width, when configured or already seen in a batch.
    fn dimension(&self) -> Option<usize> {
        None
    }

    /// Vector width, embedding a sample text when it is not known yet.
    async fn resolve_dimension(&self) -> Result<usize> {
        if let Some(dimension) = self.dimension() {
            return Ok(dimension);
        }
        let sample = self.embed(&["test".to_string()]).await?;
        match sample.first() {
            Some(vector) if !vector.is_empty() => Ok(vector.len()),
            _ => Err(Error::provider("sample embedding came back empty")),
        }
    }
}

/// Serializable provider selection, tagged by `provider`.
///
/// ```json
/// {"provider": "ollama", "model": "nomic-embed-text"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum EmbeddingProviderConfig {
    Ollama {
        #[serde(default = "default_ollama_model")]
        model: String,
        #[serde(default = "default_ollama_url")]
        base_url: String,
        #[serde(default)]
        dimension: Option<usize>,
    },
    OpenAi {
        /// Falls back to `OPENAI_API_KEY` when unset.
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default = "default_openai_url")]
        base_url: String,
        #[serde(default)]
        organization: Option<String>,
        #[serde(default)]
        project: Option<String>,
        #[serde(default)]
        timeout_secs: Option<f64>,
        #[serde(default)]
        dimension: Option<usize>,
    },
    Local {
        #[serde(default = "default_local_model")]
        model: String,
        #[serde(default)]
        normalize: bool,
        #[serde(default = "default_local_max_length")]
        max_length: usize,
        /// `cpu`, `cuda` or `cuda:N`; CPU when unset.
        #[serde(default)]
        device: Option<String>,
        #[serde(default)]
        dimension: Option<usize>,
    },
}

fn default_ollama_model() -> String {
    DEFAULT_OLLAMA_MODEL.to_string()
}

fn default_ollama_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.to_string()
}

fn default_openai_url() -> String {
    DEFAULT_OPENAI_URL.to_string()
}

fn default_local_model() -> String {
    DEFAULT_LOCAL_MODEL.to_string()
}

fn default_local_max_length() -> usize {
    DEFAULT_LOCAL_MAX_LENGTH
}

impl EmbeddingProviderConfig {
    /// Ollama on `localhost:11434` with the default model.
    pub fn ollama() -> Self {
        EmbeddingProviderConfig::Ollama {
            model: default_ollama_model(),
            base_url: default_ollama_url(),
            dimension: None,
        }
    }

    /// OpenAI with the default model; the key comes from `OPENAI_API_KEY`.
    pub fn openai() -> Self {
        EmbeddingProviderConfig::OpenAi {
            api_key: None,
            model: default_openai_model(),
            base_url: default_openai_url(),
            organization: None,
            project: None,
            timeout_secs: None,
            dimension: None,
        }
    }

    /// In-process sentence encoder with the default model.
    pub fn local() -> Self {
        EmbeddingProviderConfig::Local {
            model: default_local_model(),
            normalize: false,
            max_length: DEFAULT_LOCAL_MAX_LENGTH,
            device: None,
            dimension: None,
        }
    }

    /// Replaces the model name. Chainable.
    pub fn with_model<S: Into<String>>(mut self, name: S) -> Self {
        match &mut self {
            EmbeddingProviderConfig::Ollama { model, .. }
            | EmbeddingProviderConfig::OpenAi { model, .. }
            | EmbeddingProviderConfig::Local { model, .. } => *model = name.into(),
        }
        self
    }

    /// Replaces the base URL of a remote provider. No-op for `local`.
    pub fn with_base_url<S: Into<String>>(mut self, url: S) -> Self {
        match &mut self {
            EmbeddingProviderConfig::Ollama { base_url, .. }
            | EmbeddingProviderConfig::OpenAi { base_url, .. } => *base_url = url.into(),
            EmbeddingProviderConfig::Local { .. } => {}
        }
        self
    }

    /// Pins the expected vector width. Chainable.
    pub fn with_dimension(mut self, width: usize) -> Self {
        match &mut self {
            EmbeddingProviderConfig::Ollama { dimension, .. }
            | EmbeddingProviderConfig::OpenAi { dimension, .. }
            | EmbeddingProviderConfig::Local { dimension, .. } => *dimension = Some(width),
        }
        self
    }

    pub fn dimension(&self) -> Option<usize> {
        match self {
            EmbeddingProviderConfig::Ollama { dimension, .. }
            | EmbeddingProviderConfig::OpenAi { dimension, .. }
            | EmbeddingProviderConfig::Local { dimension, .. } => *dimension,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            EmbeddingProviderConfig::Ollama { .. } => "ollama",
            EmbeddingProviderConfig::OpenAi { .. } => "openai",
            EmbeddingProviderConfig::Local { .. } => "local",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            EmbeddingProviderConfig::Ollama { model, .. }
            | EmbeddingProviderConfig::OpenAi { model, .. }
            | EmbeddingProviderConfig::Local { model, .. } => model,
        }
    }
}

/// The closed set of built-in providers.
#[derive(Debug)]
pub enum EmbeddingProvider {
    Ollama(OllamaEmbedding),
    OpenAi(OpenAiEmbedding),
    Local(LocalEmbedding),
}

impl EmbeddingProvider {
    /// Builds a provider from its config.
    ///
    /// Fails with [`Error::ContractViolation`] when a required setting is
    /// missing, e.g. an OpenAI key with neither config nor environment set.
    pub fn from_config(config: &EmbeddingProviderConfig) -> Result<Self> {
        if config.dimension() == Some(0) {
            return Err(Error::contract("embedding dimension must be positive"));
        }
        let provider = Self::build(config)?;
        Ok(match config.dimension() {
            Some(dimension) => provider.with_dimension(dimension),
            None => provider,
        })
    }

    fn build(config: &EmbeddingProviderConfig) -> Result<Self> {
        match config {
            EmbeddingProviderConfig::Ollama {
                model, base_url, ..
            } => Ok(EmbeddingProvider::Ollama(OllamaEmbedding::new(model, base_url)?)),
            EmbeddingProviderConfig::OpenAi {
                api_key,
                model,
                base_url,
                organization,
                project,
                timeout_secs,
                ..
            } => {
                let key = match api_key {
                    Some(key) => key.clone(),
                    None => std::env::var(openai::API_KEY_ENV).map_err(|_| {
                        Error::contract(format!(
                            "OpenAI embeddings need an api_key or the {} environment variable",
                            openai::API_KEY_ENV
                        ))
                    })?,
                };
                let mut provider = OpenAiEmbedding::new(key, model, base_url)?;
                if let Some(org) = organization {
                    provider = provider.with_organization(org);
                }
                if let Some(project) = project {
                    provider = provider.with_project(project);
                }
                if let Some(secs) = timeout_secs {
                    provider = provider.with_timeout(crate::config::timeout_from_secs(*secs)?)?;
                }
                Ok(EmbeddingProvider::OpenAi(provider))
            }
            EmbeddingProviderConfig::Local {
                model,
                normalize,
                max_length,
                device,
                ..
            } => {
                let device = match device {
                    Some(device) => device.parse()?,
                    None => LocalDevice::Cpu,
                };
                Ok(EmbeddingProvider::Local(
                    LocalEmbedding::new(model)
                        .with_normalize(*normalize)
                        .with_max_length(*max_length)
                        .with_device(device),
                ))
            }
        }
    }

    fn with_dimension(self, dimension: usize) -> Self {
        match self {
            EmbeddingProvider::Ollama(p) => EmbeddingProvider::Ollama(p.with_dimension(dimension)),
            EmbeddingProvider::OpenAi(p) => EmbeddingProvider::OpenAi(p.with_dimension(dimension)),
            EmbeddingProvider::Local(p) => EmbeddingProvider::Local(p.with_dimension(dimension)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EmbeddingProvider::Ollama(_) => "ollama",
            EmbeddingProvider::OpenAi(_) => "openai",
            EmbeddingProvider::Local(_) => "local",
        }
    }
}

#[async_trait]
impl EmbeddingFunction for EmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        match self {
            EmbeddingProvider::Ollama(p) => p.embed(texts).await,
            EmbeddingProvider::OpenAi(p) => p.embed(texts).await,
            EmbeddingProvider::Local(p) => p.embed(texts).await,
        }
    }

    fn dimension(&self) -> Option<usize> {
        match self {
            EmbeddingProvider::Ollama(p) => p.dimension(),
            EmbeddingProvider::OpenAi(p) => p.dimension(),
            EmbeddingProvider::Local(p) => p.dimension(),
        }
    }
}

/// Expected vector width of a provider, pinned up front or learned from the
/// first batch it returns.
#[derive(Debug, Clone, Default)]
pub(crate) struct Dimension {
    configured: Option<usize>,
    observed: OnceLock<usize>,
}

impl Dimension {
    pub(crate) fn new(configured: Option<usize>) -> Self {
        Self {
            configured,
            observed: OnceLock::new(),
        }
    }

    pub(crate) fn get(&self) -> Option<usize> {
        self.configured.or_else(|| self.observed.get().copied())
    }

    /// Every vector must have the expected width.
    pub(crate) fn check(&self, provider: &str, vectors: &[Embedding]) -> Result<()> {
        let Some(first) = vectors.first() else {
            return Ok(());
        };
        let expected = self.get().unwrap_or(first.len());
        if let Some((position, vector)) = vectors
            .iter()
            .enumerate()
            .find(|(_, v)| v.len() != expected)
        {
            return Err(Error::provider(format!(
                "{provider} returned a {}-dimensional embedding at position {position}, expected {expected}",
                vector.len()
            )));
        }
        if self.configured.is_none() {
            let _ = self.observed.set(expected);
        }
        Ok(())
    }
}

/// One non-empty vector per input.
pub(crate) fn check_batch(provider: &str, inputs: usize, vectors: &[Embedding]) -> Result<()> {
    if vectors.len() != inputs {
        return Err(Error::provider(format!(
            "{provider} returned {} embeddings for {inputs} inputs",
            vectors.len()
        )));
    }
    if let Some(position) = vectors.iter().position(|v| v.is_empty()) {
        return Err(Error::provider(format!(
            "{provider} returned an empty embedding at position {position}"
        )));
    }
    Ok(())
}
