//! This module provides functionality for loading and handling the application's configuration.
//!
//! It defines the `ColumnMatchConfig` struct, which holds the configuration parameters,
//! a `load_config` function to load the configuration from a YAML file, and
//! `build_generator` which turns the embedding settings into a ready
//! [`EmbeddingGenerator`].
//!
//! # Examples
//!
//! Loading the configuration from a file:
//!
//! ```no_run
//! use colmatch::config::{ColumnMatchConfig, load_config};
//!
//! let config_file_path = "/path/to/config.yaml";
//! let config: ColumnMatchConfig = load_config(config_file_path).unwrap();
//! println!("{:?}", config);
//! ```

use serde::{Deserialize, Serialize};
use std::{error::Error, fs, sync::Arc};

use tracing::*;

use crate::embedding::{Embedder, EmbeddingGenerator, FallbackPolicy};
use crate::hashing::HashingEmbedder;
use crate::ranker::{DEFAULT_TOP_K, TopK};
use crate::sentence_embeddings::SentenceEmbeddingsModel;

pub const DEFAULT_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Which [`Embedder`] to run.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    /// BERT sentence-transformer on Candle (`model_id` / `model_revision`).
    #[default]
    SentenceModel,
    /// Offline feature-hashing embedder.
    Hashing,
}

/// Represents the application's configuration.
///
/// Every field except `database_url` has a default, so a minimal file is just:
///
/// ```yaml
/// database_url: "colmatch.db"
/// ```
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct ColumnMatchConfig {
    /// SQLite database holding the column catalog.
    pub database_url: String,

    #[serde(default)]
    pub embedding_backend: EmbeddingBackend,

    /// Hugging Face model repository for the sentence model.
    #[serde(default = "default_model_id")]
    pub model_id: String,

    #[serde(default = "default_model_revision")]
    pub model_revision: String,

    /// Tokens kept per text before truncation.
    #[serde(default = "default_max_sequence_length")]
    pub max_sequence_length: usize,

    /// What a failed query embedding turns into.
    #[serde(default)]
    pub fallback: FallbackPolicy,

    /// `top_k` used by the CLI when none is given.
    #[serde(default = "default_top_k")]
    pub default_top_k: i64,
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_model_revision() -> String {
    "main".to_string()
}

fn default_max_sequence_length() -> usize {
    256
}

fn default_top_k() -> i64 {
    DEFAULT_TOP_K
}

impl ColumnMatchConfig {
    /// Defaults with the catalog stored at `database_url`.
    pub fn with_database(database_url: &str) -> Self {
        Self {
            database_url: database_url.to_string(),
            embedding_backend: EmbeddingBackend::default(),
            model_id: default_model_id(),
            model_revision: default_model_revision(),
            max_sequence_length: default_max_sequence_length(),
            fallback: FallbackPolicy::default(),
            default_top_k: default_top_k(),
        }
    }

    /// Load the configured embedder and wrap it in an [`EmbeddingGenerator`].
    ///
    /// For [`EmbeddingBackend::SentenceModel`] this downloads the weights on first use.
    pub fn build_generator(&self) -> Result<EmbeddingGenerator, Box<dyn Error>> {
        let embedder: Arc<dyn Embedder> = match self.embedding_backend {
            EmbeddingBackend::SentenceModel => Arc::new(SentenceEmbeddingsModel::load(
                &self.model_id,
                &self.model_revision,
                self.max_sequence_length,
            )?),
            EmbeddingBackend::Hashing => Arc::new(HashingEmbedder::default()),
        };
        info!(
            "Embedding backend {:?} ready: {}",
            self.embedding_backend,
            embedder.model_id()
        );
        Ok(EmbeddingGenerator::new(embedder, self.fallback)?)
    }
}

/// Loads the application's configuration from a YAML file.
///
/// This function reads the file at the given path, parses it as YAML, and
/// constructs a `ColumnMatchConfig` struct from it.
///
/// # Parameters
///
/// - `file`: The path to the YAML configuration file.
///
/// # Returns
///
/// - `Ok(ColumnMatchConfig)`: The loaded configuration.
/// - `Err(Box<dyn Error>)`: An error occurred while reading the file or parsing the YAML.
///
/// # Examples
///
/// ```no_run
/// use colmatch::config::load_config;
///
/// let config_file_path = "/path/to/config.yaml";
/// match load_config(config_file_path) {
///     Ok(config) => println!("{:?}", config),
///     Err(err) => eprintln!("Error loading config: {}", err),
/// }
/// ```
pub fn load_config(file: &str) -> Result<ColumnMatchConfig, Box<dyn Error>> {
    debug!("LOADING: {:?}", file);
    let content = fs::read_to_string(file)?;
    let config: ColumnMatchConfig = serde_yaml::from_str(&content)?;
    TopK::try_from(config.default_top_k)?;
    Ok(config)
}
