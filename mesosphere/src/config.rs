//! Client configuration.

use std::time::Duration;

use crate::embedding::EmbeddingProviderConfig;
use crate::{Error, Result};

/// Environment variable holding the API base URL.
pub const API_URL_ENV: &str = "MESOSPHERE_API_URL";
/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "MESOSPHERE_API_KEY";
/// Environment variable holding the request timeout in seconds.
pub const TIMEOUT_ENV: &str = "MESOSPHERE_TIMEOUT_SECS";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration consumed when building a [`Client`](crate::Client).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use mesosphere::{ClientConfig, EmbeddingProviderConfig};
///
/// let config = ClientConfig::new("http://localhost:8000", "secret")
///     .with_timeout(Duration::from_secs(10))
///     .with_embedding(EmbeddingProviderConfig::ollama());
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the vector API, e.g. `https://db.example.com`.
    pub api_url: String,
    /// Key sent with every request.
    pub api_key: String,
    /// Per-request timeout for collection calls.
    pub timeout: Duration,
    /// Provider used when callers pass text instead of vectors.
    pub embedding: Option<EmbeddingProviderConfig>,
}

impl ClientConfig {
    /// Creates a config with the default timeout and no embedding provider.
    pub fn new<U: Into<String>, K: Into<String>>(api_url: U, api_key: K) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
            embedding: None,
        }
    }

    /// Reads `MESOSPHERE_API_URL`, `MESOSPHERE_API_KEY` and, optionally,
    /// `MESOSPHERE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let api_url = required_env(API_URL_ENV)?;
        let api_key = required_env(API_KEY_ENV)?;
        let mut config = Self::new(api_url, api_key);

        if let Ok(raw) = std::env::var(TIMEOUT_ENV) {
            let secs: f64 = raw.trim().parse().map_err(|_| {
                Error::contract(format!("{TIMEOUT_ENV} must be a number of seconds, got '{raw}'"))
            })?;
            config.timeout = timeout_from_secs(secs)?;
        }
        Ok(config)
    }

    /// Sets the request timeout. Chainable.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the embedding provider. Chainable.
    pub fn with_embedding(mut self, embedding: EmbeddingProviderConfig) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Checks the URL parses and the key is non-blank.
    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(Error::contract("api_url must be a non-empty string"));
        }
        reqwest::Url::parse(&self.api_url)
            .map_err(|e| Error::contract(format!("invalid api_url '{}': {e}", self.api_url)))?;
        if self.api_key.trim().is_empty() {
            return Err(Error::contract("api_key must be a non-empty string"));
        }
        if self.timeout.is_zero() {
            return Err(Error::contract("timeout must be greater than zero"));
        }
        Ok(())
    }
}

fn required_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| Error::contract(format!("environment variable {name} is not set")))
}

pub(crate) fn timeout_from_secs(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| Error::contract(format!("timeout must be a positive number of seconds, got {secs}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("http://localhost:8000", "key");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.embedding.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ClientConfig::new("", "key").validate().is_err());
        assert!(ClientConfig::new("not a url", "key").validate().is_err());
        assert!(ClientConfig::new("http://localhost", "  ").validate().is_err());
        assert!(ClientConfig::new("http://localhost", "key")
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_timeout_from_secs() {
        assert_eq!(timeout_from_secs(1.5).unwrap(), Duration::from_millis(1500));
        assert!(timeout_from_secs(0.0).is_err());
        assert!(timeout_from_secs(-3.0).is_err());
        assert!(timeout_from_secs(f64::NAN).is_err());
    }
}
