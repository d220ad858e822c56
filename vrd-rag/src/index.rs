//! Exact inner-product similarity index.
//!
//! [`SimilarityIndex`] is a flat, immutable list of unit vectors keyed by chunk
//! position. With unit-normalized inputs the inner product is the cosine
//! similarity, so a brute-force scan is exact; one document yields at most a
//! few thousand chunks, well within what a linear scan handles per query.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// A single search hit: chunk position and its similarity to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Position of the matching vector (and its chunk).
    pub position: usize,
    /// Inner product with the query.
    pub score: f32,
}

/// An immutable collection of equal-dimension vectors.
///
/// Normalization is the caller's responsibility: the index scores with a
/// plain dot product.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityIndex {
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
}

impl SimilarityIndex {
    /// Build an index from vectors, position `i` holding `vectors[i]`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexError`] if the vectors do not all share one
    /// non-zero dimension.
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let dimensions = vectors.first().map_or(0, Vec::len);
        if !vectors.is_empty() && dimensions == 0 {
            return Err(RagError::IndexError("vectors must not be empty".into()));
        }
        if let Some((position, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dimensions)
        {
            return Err(RagError::IndexError(format!(
                "vector {position} has dimension {}, expected {dimensions}",
                v.len()
            )));
        }
        Ok(Self { dimensions, vectors })
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Dimension shared by every indexed vector (0 for an empty index).
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Return the `k` vectors with the highest inner product with `query`.
    ///
    /// Results are sorted by descending score; equal scores keep ascending
    /// position order. Asking for more than [`len`](Self::len) hits returns
    /// every vector.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexError`] if `query` has the wrong dimension.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Hit>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(RagError::IndexError(format!(
                "query has dimension {}, index expects {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut hits: Vec<Hit> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, v)| Hit { position, score: dot(v, query) + 0.0 })
            .collect();

        // Adding 0.0 turns -0.0 into +0.0 so `total_cmp` sees zero scores as
        // equal. Stable sort: ties stay in position order.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
