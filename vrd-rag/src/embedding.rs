//! Embedder capability for turning text into vectors.

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// A capability that maps text segments to fixed-length vectors.
///
/// Implementations wrap a specific backend (a local model, a hosted API)
/// behind a unified async interface. [`embed_batch`](Embedder::embed_batch)
/// must return one vector per input, in input order, all of
/// [`dimensions`](Embedder::dimensions) length. Outputs need not be
/// normalized; the retriever normalizes them.
///
/// # Example
///
/// ```rust,ignore
/// use vrd_rag::{Embedder, HashingEmbedder};
///
/// let embedder = HashingEmbedder::new(256);
/// let vectors = embedder.embed_batch(&["rejet des eaux pluviales"]).await?;
/// assert_eq!(vectors[0].len(), embedder.dimensions());
/// ```
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Generate one embedding per input text, preserving order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Generate an embedding for a single text.
    ///
    /// The default implementation delegates to
    /// [`embed_batch`](Embedder::embed_batch).
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text]).await?.into_iter().next().ok_or_else(|| {
            RagError::EmbeddingError {
                provider: self.name().to_string(),
                message: "no vector returned for a single input".into(),
            }
        })
    }

    /// Return the dimensionality of embeddings produced by this embedder.
    fn dimensions(&self) -> usize;
}

/// Scale `vector` to unit L2 norm in place.
///
/// Zero vectors are left untouched; they score 0 against everything.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Deterministic hashed bag-of-words embeddings for offline use.
///
/// Each lowercase alphanumeric token is hashed into one of `dimensions`
/// buckets with a hash-derived sign. Texts sharing vocabulary get a positive
/// cosine similarity, which is enough for the offline demo mode and tests.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// Create an embedder producing vectors of `dimensions` length.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let hash = token
                .chars()
                .flat_map(char::to_lowercase)
                .fold(0xcbf2_9ce4_8422_2325u64, |acc, c| {
                    acc.wrapping_mul(0x0100_0000_01b3) ^ u64::from(c)
                });
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        normalize(&mut vector);
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
