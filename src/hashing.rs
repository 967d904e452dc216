//! # Hashing embedder
//!
//! An offline [`Embedder`] that needs no model download. Text is lowercased and
//! split on whitespace and punctuation; every token contributes itself plus its
//! character bigrams as features. Each feature is hashed with BLAKE3 into one of
//! `dimension` buckets, and the bucket counts are L2-normalized.
//!
//! It captures surface overlap only, which is enough for synonym-list catalogs in
//! agglutinative languages (`기부했나요` and `기부 금액` share the bigram `기부`) and
//! makes tests reproducible. Counts are never negative, so any shared feature gives
//! a strictly positive cosine similarity.

use crate::embedding::{EMBEDDING_DIM, Embedder};
use crate::error::EmbeddingError;

pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn bucket(&self, feature: &str) -> usize {
        let hash = blake3::hash(feature.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&hash.as_bytes()[..8]);
        (u64::from_le_bytes(head) % self.dimension as u64) as usize
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(EMBEDDING_DIM)
    }
}

/// Tokens plus the character bigrams inside each token.
fn features(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut out = Vec::new();
    for token in lowered
        .split(|c: char| c.is_whitespace() || c.is_ascii_punctuation() || c == '·')
        .filter(|t| !t.is_empty())
    {
        let chars: Vec<char> = token.chars().collect();
        out.push(format!("t:{token}"));
        for pair in chars.windows(2) {
            out.push(format!("b:{}{}", pair[0], pair[1]));
        }
    }
    out
}

impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        "hashing-bigram"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = vec![0.0f32; self.dimension];
        for feature in features(text) {
            vector[self.bucket(&feature)] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;

    #[test]
    fn test_dimension_and_determinism() {
        let e = HashingEmbedder::default();
        let a = e.embed("기부 금액, 후원 금액").unwrap();
        let b = e.embed("기부 금액, 후원 금액").unwrap();
        assert_eq!(a.len(), EMBEDDING_DIM);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let e = HashingEmbedder::default();
        let v = e.embed("").unwrap();
        assert_eq!(v.len(), EMBEDDING_DIM);
        assert!(v.iter().all(|x| *x == 0.0));
        assert!(e.embed("  ,, ").unwrap().iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_unit_norm() {
        let v = HashingEmbedder::default().embed("donation amount").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_bigram_scores_positive() {
        let e = HashingEmbedder::default();
        let query = e.embed("얼마를 기부했나요").unwrap();
        let column = e.embed("기부 금액, 후원 금액").unwrap();
        assert!(cosine_similarity(&query, &column) > 0.0);
    }

    #[test]
    fn test_features_split_on_punctuation() {
        let f = features("Donor, Name");
        assert!(f.contains(&"t:donor".to_string()));
        assert!(f.contains(&"t:name".to_string()));
        assert!(f.contains(&"b:do".to_string()));
        assert!(!f.iter().any(|x| x.contains(',')));
    }
}
