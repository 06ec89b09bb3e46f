//! Text embedding capability.
//!
//! Detectors score tools by comparing embedded texts, but never care where
//! the vectors come from. [`TextEmbedder`] is the seam: the built-in
//! [`HashEmbedder`] works offline and deterministically, and a semantic
//! model (sentence transformer, remote embedding API) plugs in behind the
//! same trait without touching detector code.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::error::Result;

/// Produces a fixed-width dense vector for a piece of text.
///
/// Inputs are expected to be normalized already (see
/// [`textproc::preprocess`](crate::textproc::preprocess)); an embedder only
/// vectorizes.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Embeds one text. All vectors from the same embedder must share a
    /// dimension.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Deterministic lexical embedder based on feature hashing.
///
/// Each whitespace token is hashed into one of `dims` buckets with a
/// hash-derived sign, so texts sharing vocabulary land near each other
/// while unrelated texts stay near-orthogonal. No model download, no
/// network, identical output for identical input.
///
/// This is a lexical signal, not a semantic one: synonyms do not match.
/// It is the default used when no semantic embedder is configured, and it
/// keeps detector tests hermetic.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    /// Default vector width.
    pub const DEFAULT_DIMS: usize = 256;

    /// Creates an embedder with the default dimension.
    pub fn new() -> Self {
        Self {
            dims: Self::DEFAULT_DIMS,
        }
    }

    /// Creates an embedder with a custom dimension.
    ///
    /// # Panics
    /// Panics if `dims` is zero.
    pub fn with_dims(dims: usize) -> Self {
        assert!(dims > 0, "embedding dimension must be nonzero");
        Self { dims }
    }

    fn embed_tokens(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];
        for token in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let h = hasher.finish();
            let index = (h % self.dims as u64) as usize;
            // Sign bit balances collisions so unrelated texts stay near zero
            // similarity instead of drifting positive.
            let sign = if h & (1 << 63) == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextEmbedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_tokens(text))
    }
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero magnitude, so an empty text
/// compares as maximally dissimilar rather than erroring.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Element-wise mean of a set of equal-length vectors.
///
/// Returns an empty vector for empty input.
pub fn centroid(vectors: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = vectors.first() else {
        return Vec::new();
    };
    let mut mean = vec![0.0f32; first.len()];
    for vector in vectors {
        for (slot, value) in mean.iter_mut().zip(vector.iter()) {
            *slot += value;
        }
    }
    let count = vectors.len() as f32;
    for slot in &mut mean {
        *slot /= count;
    }
    mean
}
