//! # Embedding generation
//!
//! Turns text into fixed-width vectors for the column catalog.
//!
//! - [`Embedder`] is the seam for a concrete model. The crate ships two:
//!   [`SentenceEmbeddingsModel`](crate::sentence_embeddings::SentenceEmbeddingsModel)
//!   (all-MiniLM-L6-v2 on Candle) and [`HashingEmbedder`](crate::hashing::HashingEmbedder)
//!   (offline, deterministic).
//! - [`EmbeddingGenerator`] wraps an embedder, checks every vector against the
//!   catalog shape ([`EMBEDDING_DIM`] finite components), and applies the
//!   configured [`FallbackPolicy`] when the model fails.
//!
//! ## Fallback
//! With [`FallbackPolicy::ZeroVector`] a failed query embedding becomes an all-zero
//! vector and the returned [`Embedding`] is flagged with `fallback = true`. Because a
//! zero vector scores `0.0` against everything, ranking still answers but the caller
//! can tell the result is low-confidence. [`FallbackPolicy::Propagate`] returns the
//! error instead.
//!
//! ```rust
//! use std::sync::Arc;
//! use colmatch::embedding::{EmbeddingGenerator, FallbackPolicy};
//! use colmatch::hashing::HashingEmbedder;
//!
//! let generator = EmbeddingGenerator::new(
//!     Arc::new(HashingEmbedder::default()),
//!     FallbackPolicy::Propagate,
//! ).unwrap();
//! let e = generator.embed("기부 금액").unwrap();
//! assert_eq!(e.vector.len(), 384);
//! assert!(!e.fallback);
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::EmbeddingError;

/// Width of every vector stored in the catalog (all-MiniLM-L6-v2).
pub const EMBEDDING_DIM: usize = 384;

/// A text embedding model.
///
/// Implementations must be deterministic for a fixed model: the same input
/// yields the same vector.
pub trait Embedder: Send + Sync {
    /// Identifier of the underlying model, used in logs and health output.
    fn model_id(&self) -> &str;

    /// Number of components in every produced vector.
    fn dimension(&self) -> usize;

    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// What to do when the model cannot produce a vector.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Return the error to the caller.
    #[default]
    Propagate,
    /// Substitute an all-zero vector tagged as a fallback.
    ZeroVector,
}

/// A generated vector plus whether it is a fallback substitute.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub vector: Vec<f32>,
    /// `true` when the model failed and `vector` is the zero-vector stand-in.
    pub fallback: bool,
}

/// Check a vector against the catalog shape: `dimension` components, all finite.
pub fn validate_vector(vector: &[f32], dimension: usize) -> Result<(), EmbeddingError> {
    if vector.len() != dimension {
        return Err(EmbeddingError::DimensionMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }
    match vector.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(EmbeddingError::NonFinite { index }),
        None => Ok(()),
    }
}

/// Shape-checking wrapper around an [`Embedder`].
///
/// Constructed once at startup and shared (it is cheap to clone behind an `Arc`).
pub struct EmbeddingGenerator {
    embedder: Arc<dyn Embedder>,
    fallback: FallbackPolicy,
}

impl EmbeddingGenerator {
    /// Wrap `embedder`.
    ///
    /// # Errors
    /// [`EmbeddingError::DimensionMismatch`] if the embedder does not produce
    /// [`EMBEDDING_DIM`]-wide vectors.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        fallback: FallbackPolicy,
    ) -> Result<Self, EmbeddingError> {
        if embedder.dimension() != EMBEDDING_DIM {
            return Err(EmbeddingError::DimensionMismatch {
                expected: EMBEDDING_DIM,
                actual: embedder.dimension(),
            });
        }
        Ok(Self { embedder, fallback })
    }

    pub fn model_id(&self) -> &str {
        self.embedder.model_id()
    }

    pub fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }

    pub fn fallback_policy(&self) -> FallbackPolicy {
        self.fallback
    }

    /// Run the model and validate the result. Never substitutes a fallback.
    pub fn embed_strict(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let vector = self.embedder.embed(text)?;
        validate_vector(&vector, EMBEDDING_DIM)?;
        Ok(vector)
    }

    /// Run the model, applying the configured [`FallbackPolicy`] on failure.
    pub fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        match self.embed_strict(text) {
            Ok(vector) => {
                debug!(model = self.model_id(), chars = text.len(), "embedded text");
                Ok(Embedding {
                    vector,
                    fallback: false,
                })
            }
            Err(e) => match self.fallback {
                FallbackPolicy::Propagate => Err(e),
                FallbackPolicy::ZeroVector => {
                    warn!(
                        model = self.model_id(),
                        error = %e,
                        "embedding failed, substituting zero vector"
                    );
                    Ok(Embedding {
                        vector: vec![0.0; EMBEDDING_DIM],
                        fallback: true,
                    })
                }
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Small embedders for exercising error paths.

    use super::*;

    /// Returns a fixed vector for every input.
    pub struct ConstantEmbedder {
        pub vector: Vec<f32>,
    }

    impl Embedder for ConstantEmbedder {
        fn model_id(&self) -> &str {
            "constant"
        }
        fn dimension(&self) -> usize {
            EMBEDDING_DIM
        }
        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(self.vector.clone())
        }
    }

    /// Fails for any text containing `poison`, delegates otherwise.
    pub struct PoisonedEmbedder<E> {
        pub inner: E,
        pub poison: &'static str,
    }

    impl<E: Embedder> Embedder for PoisonedEmbedder<E> {
        fn model_id(&self) -> &str {
            "poisoned"
        }
        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if text.contains(self.poison) {
                return Err(EmbeddingError::Inference(format!(
                    "refusing to embed {:?}",
                    text
                )));
            }
            self.inner.embed(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::hashing::HashingEmbedder;

    #[test]
    fn test_rejects_wrong_width_model() {
        let result = EmbeddingGenerator::new(
            Arc::new(HashingEmbedder::new(128)),
            FallbackPolicy::Propagate,
        );
        assert!(matches!(
            result,
            Err(EmbeddingError::DimensionMismatch {
                expected: 384,
                actual: 128
            })
        ));
    }

    #[test]
    fn test_non_finite_output_is_an_error() {
        let mut vector = vec![0.5; EMBEDDING_DIM];
        vector[17] = f32::NAN;
        let generator =
            EmbeddingGenerator::new(Arc::new(ConstantEmbedder { vector }), FallbackPolicy::Propagate)
                .unwrap();
        assert!(matches!(
            generator.embed_strict("anything"),
            Err(EmbeddingError::NonFinite { index: 17 })
        ));
    }

    #[test]
    fn test_zero_vector_fallback_is_tagged() {
        let embedder = PoisonedEmbedder {
            inner: HashingEmbedder::default(),
            poison: "boom",
        };
        let generator =
            EmbeddingGenerator::new(Arc::new(embedder), FallbackPolicy::ZeroVector).unwrap();

        let ok = generator.embed("fine").unwrap();
        assert!(!ok.fallback);

        let degraded = generator.embed("boom").unwrap();
        assert!(degraded.fallback);
        assert_eq!(degraded.vector, vec![0.0; EMBEDDING_DIM]);

        // Strict mode ignores the policy.
        assert!(generator.embed_strict("boom").is_err());
    }

    #[test]
    fn test_propagate_returns_error() {
        let embedder = PoisonedEmbedder {
            inner: HashingEmbedder::default(),
            poison: "boom",
        };
        let generator =
            EmbeddingGenerator::new(Arc::new(embedder), FallbackPolicy::Propagate).unwrap();
        assert!(matches!(
            generator.embed("boom"),
            Err(EmbeddingError::Inference(_))
        ));
    }

    #[test]
    fn test_embedding_is_deterministic() {
        let generator = EmbeddingGenerator::new(
            Arc::new(HashingEmbedder::default()),
            FallbackPolicy::Propagate,
        )
        .unwrap();
        let a = generator.embed("후원자 이름").unwrap();
        let b = generator.embed("후원자 이름").unwrap();
        assert_eq!(a, b);
    }
}
