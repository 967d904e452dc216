//! # Sentence embeddings
//!
//! The default [`Embedder`]: a BERT sentence-transformer run with Candle (pure
//! Rust, CPU). With the default model, `sentence-transformers/all-MiniLM-L6-v2`,
//! every text becomes a 384-d unit vector.
//!
//! ## Pipeline
//! 1. Tokenize (truncated to `max_sequence_length` tokens).
//! 2. BERT forward pass.
//! 3. Mean pooling over the attention mask.
//! 4. L2 normalization.
//!
//! Weights, config, and tokenizer are fetched once through the Hugging Face Hub
//! cache (`hf-hub`), so only the first start needs network access.
//!
//! ```no_run
//! use colmatch::embedding::Embedder;
//! use colmatch::sentence_embeddings::SentenceEmbeddingsModel;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = SentenceEmbeddingsModel::load("sentence-transformers/all-MiniLM-L6-v2", "main", 256)?;
//! let v = model.embed("기부 금액")?;
//! assert_eq!(v.len(), 384);
//! # Ok(()) }
//! ```

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{Repo, RepoType, api::sync::Api};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::info;

use crate::embedding::Embedder;
use crate::error::EmbeddingError;

/// Sentence embeddings model using Candle (pure Rust)
pub struct SentenceEmbeddingsModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dimension: usize,
}

impl SentenceEmbeddingsModel {
    /// Load the model from Hugging Face Hub
    pub fn load(
        model_id: &str,
        revision: &str,
        max_sequence_length: usize,
    ) -> Result<Self, EmbeddingError> {
        let device = Device::Cpu;
        info!(model_id, revision, "loading sentence embeddings model");

        let repo = Repo::with_revision(model_id.to_string(), RepoType::Model, revision.to_string());
        let api = Api::new().map_err(load_err)?;
        let api_repo = api.repo(repo);

        let config_filename = api_repo.get("config.json").map_err(load_err)?;
        let tokenizer_filename = api_repo.get("tokenizer.json").map_err(load_err)?;
        let weights_filename = api_repo.get("model.safetensors").map_err(load_err)?;

        let config = std::fs::read_to_string(config_filename).map_err(load_err)?;
        let raw: serde_json::Value = serde_json::from_str(&config).map_err(load_err)?;
        let dimension = raw
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| load_err("config.json has no hidden_size"))? as usize;
        let config: Config = serde_json::from_value(raw).map_err(load_err)?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_filename).map_err(load_err)?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_sequence_length,
                ..Default::default()
            }))
            .map_err(load_err)?;
        tokenizer.with_padding(None);

        // SAFETY: the safetensors file lives in the hub cache and is not mutated while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_filename], DTYPE, &device)
                .map_err(load_err)?
        };
        let model = BertModel::load(vb, &config).map_err(load_err)?;

        Ok(Self {
            model,
            tokenizer,
            device,
            model_id: model_id.to_string(),
            dimension,
        })
    }

    /// Mean pooling over token embeddings, considering attention mask
    fn mean_pooling(
        &self,
        embeddings: &Tensor,
        attention_mask: &[u32],
    ) -> Result<Tensor, EmbeddingError> {
        // embeddings: [1, seq_len, hidden]; mask reshaped to [1, seq_len, 1] for broadcasting
        let mask = Tensor::new(attention_mask, &self.device)?
            .to_dtype(DType::F32)?
            .unsqueeze(0)?
            .unsqueeze(2)?;

        let sum = embeddings.broadcast_mul(&mask)?.sum(1)?;
        let count = mask.sum(1)?.clamp(1f32, f32::INFINITY)?;

        Ok(sum.broadcast_div(&count)?.squeeze(0)?)
    }

    /// L2 normalize the embedding vector
    fn normalize(&self, tensor: &Tensor) -> Result<Tensor, EmbeddingError> {
        let norm = tensor.sqr()?.sum_all()?.sqrt()?;
        Ok(tensor.broadcast_div(&norm)?)
    }
}

impl Embedder for SentenceEmbeddingsModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let tokens = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbeddingError::Inference(format!("tokenization error: {e}")))?;

        let token_ids = Tensor::new(tokens.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(tokens.get_type_ids(), &self.device)?.unsqueeze(0)?;

        let output = self.model.forward(&token_ids, &token_type_ids, None)?;
        let pooled = self.mean_pooling(&output, tokens.get_attention_mask())?;
        let normalized = self.normalize(&pooled)?;

        Ok(normalized.to_vec1::<f32>()?)
    }
}

fn load_err(e: impl std::fmt::Display) -> EmbeddingError {
    EmbeddingError::ModelLoad(e.to_string())
}
