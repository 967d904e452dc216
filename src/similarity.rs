//! # Similarity
//!
//! Cosine similarity between two embedding vectors.
//!
//! Sums are accumulated in `f64` and narrowed at the end. Both the dot product and
//! the product of magnitudes are computed in the same element order for either
//! argument order, so `cosine_similarity(a, b) == cosine_similarity(b, a)` holds
//! bit-for-bit.

/// Cosine of the angle between `a` and `b`, in approximately `[-1.0, 1.0]`.
///
/// Returns exactly `0.0` when either vector has zero magnitude, so degenerate
/// embeddings sort below every real match instead of producing NaN.
/// Vectors of different lengths are treated the same way.
///
/// # Examples
/// ```rust
/// use colmatch::similarity::cosine_similarity;
///
/// let a = [1.0, 0.0];
/// let b = [0.0, 1.0];
/// assert_eq!(cosine_similarity(&a, &b), 0.0);
/// assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
/// assert_eq!(cosine_similarity(&a, &[0.0, 0.0]), 0.0);
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b).fold(
        (0.0f64, 0.0f64, 0.0f64),
        |(dot, na, nb), (&x, &y)| {
            let (x, y) = (x as f64, y as f64);
            (dot + x * y, na + x * x, nb + y * y)
        },
    );

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}
