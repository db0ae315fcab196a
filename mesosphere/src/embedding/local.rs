use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use super::{Dimension, EmbeddingFunction, DEFAULT_LOCAL_MAX_LENGTH};
use crate::{Embedding, Error, Result};

/// Where the in-process model runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LocalDevice {
    #[default]
    Cpu,
    /// CUDA device by ordinal. Needs candle built with CUDA support.
    Cuda(usize),
}

impl FromStr for LocalDevice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let device = s.trim().to_ascii_lowercase();
        match device.as_str() {
            "cpu" => Ok(LocalDevice::Cpu),
            "cuda" | "gpu" => Ok(LocalDevice::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|ordinal| ordinal.parse().ok())
                .map(LocalDevice::Cuda)
                .ok_or_else(|| {
                    Error::contract(format!(
                        "unknown device '{s}', expected cpu, cuda or cuda:N"
                    ))
                }),
        }
    }
}

impl fmt::Display for LocalDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalDevice::Cpu => f.write_str("cpu"),
            LocalDevice::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
        }
    }
}

/// In-process sentence encoder.
///
/// Downloads a BERT-family model from the Hugging Face hub on first use and
/// mean-pools its last hidden state. Requires the `local-model` feature;
/// without it every non-empty `embed` call fails with
/// [`Error::Provider`](crate::Error::Provider).
pub struct LocalEmbedding {
    model_id: String,
    normalize: bool,
    max_length: usize,
    device: LocalDevice,
    dimension: Dimension,
    #[cfg(feature = "local-model")]
    encoder: tokio::sync::OnceCell<std::sync::Arc<encoder::SentenceEncoder>>,
}

impl LocalEmbedding {
    pub fn new(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            normalize: false,
            max_length: DEFAULT_LOCAL_MAX_LENGTH,
            device: LocalDevice::Cpu,
            dimension: Dimension::default(),
            #[cfg(feature = "local-model")]
            encoder: tokio::sync::OnceCell::new(),
        }
    }

    /// L2-normalize every output vector.
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Longest token sequence fed to the model; longer inputs are truncated.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length.max(1);
        self
    }

    pub fn with_device(mut self, device: LocalDevice) -> Self {
        self.device = device;
        self
    }

    /// Rejects batches whose vectors are not `dimension` wide.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Dimension::new(Some(dimension));
        self
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn normalize(&self) -> bool {
        self.normalize
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn device(&self) -> LocalDevice {
        self.device
    }
}

impl fmt::Debug for LocalEmbedding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalEmbedding")
            .field("model_id", &self.model_id)
            .field("normalize", &self.normalize)
            .field("max_length", &self.max_length)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "local-model")]
#[async_trait]
impl EmbeddingFunction for LocalEmbedding {
    #[tracing::instrument(skip(self, texts), fields(model = %self.model_id, count = texts.len()))]
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        use std::sync::Arc;

        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encoder = self
            .encoder
            .get_or_try_init(|| async {
                let model_id = self.model_id.clone();
                let max_length = self.max_length;
                let device = self.device;
                tracing::debug!(%device, "loading sentence encoder");
                tokio::task::spawn_blocking(move || {
                    encoder::SentenceEncoder::load(&model_id, max_length, device)
                })
                .await
                .map_err(|e| Error::provider(format!("model loader panicked: {e}")))?
                .map(Arc::new)
            })
            .await?
            .clone();

        let texts = texts.to_vec();
        let normalize = self.normalize;
        let vectors = tokio::task::spawn_blocking(move || encoder.encode(&texts, normalize))
            .await
            .map_err(|e| Error::provider(format!("encoder panicked: {e}")))??;
        self.dimension.check("local", &vectors)?;
        Ok(vectors)
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension.get()
    }
}

#[cfg(not(feature = "local-model"))]
#[async_trait]
impl EmbeddingFunction for LocalEmbedding {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        Err(Error::provider(format!(
            "local embedding model '{}' needs mesosphere built with the `local-model` feature",
            self.model_id
        )))
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension.get()
    }
}

#[cfg(feature = "local-model")]
mod encoder {
    use candle_core::{DType, Device, Tensor};
    use candle_nn::VarBuilder;
    use candle_transformers::models::bert::{BertModel, Config};
    use hf_hub::{api::sync::Api, Repo, RepoType};
    use tokenizers::{PaddingParams, Tokenizer, TruncationParams};

    use super::LocalDevice;
    use crate::embedding::check_batch;
    use crate::{Embedding, Error, Result};

    pub(super) struct SentenceEncoder {
        model: BertModel,
        tokenizer: Tokenizer,
        device: Device,
    }

    fn provider_error<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> Error + '_ {
        move |e| Error::provider(format!("{context}: {e}"))
    }

    impl SentenceEncoder {
        pub(super) fn load(model_id: &str, max_length: usize, device: LocalDevice) -> Result<Self> {
            let device = match device {
                LocalDevice::Cpu => Device::Cpu,
                LocalDevice::Cuda(ordinal) => {
                    Device::new_cuda(ordinal).map_err(provider_error("cuda device"))?
                }
            };
            let api = Api::new().map_err(provider_error("hub client"))?;
            let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

            let tokenizer_path = repo.get("tokenizer.json").map_err(provider_error("tokenizer.json"))?;
            let config_path = repo.get("config.json").map_err(provider_error("config.json"))?;
            let weights_path = repo
                .get("model.safetensors")
                .map_err(provider_error("model.safetensors"))?;

            let raw_config =
                std::fs::read_to_string(config_path).map_err(provider_error("config.json"))?;
            let config: Config =
                serde_json::from_str(&raw_config).map_err(provider_error("config.json"))?;

            let mut tokenizer =
                Tokenizer::from_file(tokenizer_path).map_err(provider_error("tokenizer"))?;
            tokenizer.with_padding(Some(PaddingParams::default()));
            tokenizer
                .with_truncation(Some(TruncationParams {
                    max_length,
                    ..Default::default()
                }))
                .map_err(provider_error("tokenizer"))?;

            // SAFETY: the weights file lives in the hub cache and is not
            // rewritten while mapped.
            let vb = unsafe {
                VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                    .map_err(provider_error("model weights"))?
            };
            let model = BertModel::load(vb, &config).map_err(provider_error("model"))?;

            Ok(Self {
                model,
                tokenizer,
                device,
            })
        }

        pub(super) fn encode(&self, texts: &[String], normalize: bool) -> Result<Vec<Embedding>> {
            let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
            let encodings = self
                .tokenizer
                .encode_batch(inputs, true)
                .map_err(provider_error("tokenization"))?;

            let pooled = self.forward(&encodings, normalize).map_err(provider_error("inference"))?;
            let vectors = (0..texts.len())
                .map(|row| pooled.get(row).and_then(|t| t.to_vec1::<f32>()))
                .collect::<candle_core::Result<Vec<_>>>()
                .map_err(provider_error("inference"))?;
            check_batch("local", texts.len(), &vectors)?;
            Ok(vectors)
        }

        fn forward(
            &self,
            encodings: &[tokenizers::Encoding],
            normalize: bool,
        ) -> candle_core::Result<Tensor> {
            let batch = encodings.len();
            let seq_len = encodings.first().map_or(0, |e| e.get_ids().len());

            let ids: Vec<u32> = encodings.iter().flat_map(|e| e.get_ids().iter().copied()).collect();
            let mask: Vec<u32> = encodings
                .iter()
                .flat_map(|e| e.get_attention_mask().iter().copied())
                .collect();

            let ids = Tensor::from_vec(ids, (batch, seq_len), &self.device)?;
            let mask = Tensor::from_vec(mask, (batch, seq_len), &self.device)?;
            let type_ids = ids.zeros_like()?;

            let hidden = self.model.forward(&ids, &type_ids, Some(&mask))?;
            let pooled = mean_pooling(&hidden, &mask)?;
            if normalize {
                l2_normalize(&pooled)
            } else {
                Ok(pooled)
            }
        }
    }

    fn mean_pooling(hidden: &Tensor, mask: &Tensor) -> candle_core::Result<Tensor> {
        let mask = mask
            .unsqueeze(2)?
            .broadcast_as(hidden.shape())?
            .to_dtype(hidden.dtype())?;
        let summed = (hidden * &mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
        summed.broadcast_div(&counts)
    }

    fn l2_normalize(tensor: &Tensor) -> candle_core::Result<Tensor> {
        let norm = tensor.sqr()?.sum_keepdim(1)?.sqrt()?;
        tensor.broadcast_div(&norm.clamp(1e-12, f64::MAX)?)
    }
}
