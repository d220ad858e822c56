//! Configuration for the answer pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chunking::ChunkStrategy;
use crate::error::{RagError, Result};
use crate::generation::GenerationOptions;

/// Configuration parameters for the answer pipeline.
///
/// Thresholds are deployment tunables: the relevance cut-off in particular has
/// no single correct value and should be adjusted to the embedder in use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// How documents are split into chunks.
    pub chunk_strategy: ChunkStrategy,
    /// Number of candidates fetched from the index per query.
    pub top_k: usize,
    /// Minimum cosine similarity a candidate needs to be kept.
    pub min_score: f32,
    /// Answers shorter than this (in characters, after cleanup) are rejected.
    pub min_answer_chars: usize,
    /// Upper bound on a single generator call, in seconds.
    pub generation_timeout_secs: u64,
    /// Options passed through to the generator.
    pub generation: GenerationOptions,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 80,
            chunk_strategy: ChunkStrategy::Fixed,
            top_k: 5,
            min_score: 0.5,
            min_answer_chars: 30,
            generation_timeout_secs: 120,
            generation: GenerationOptions::default(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// The generator timeout as a [`Duration`].
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    /// Check that parameters are consistent.
    ///
    /// Configs deserialized from a file bypass the builder, so callers loading
    /// one should validate it before use.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `min_score` is NaN or outside `[-1, 1]`
    /// - `generation_timeout_secs == 0`
    /// - the generation options are out of range
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".into()));
        }
        if !(-1.0..=1.0).contains(&self.min_score) {
            return Err(RagError::ConfigError(format!(
                "min_score ({}) must be within [-1, 1]",
                self.min_score
            )));
        }
        if self.generation_timeout_secs == 0 {
            return Err(RagError::ConfigError(
                "generation_timeout_secs must be greater than zero".into(),
            ));
        }
        self.generation.validate()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the chunking strategy.
    pub fn chunk_strategy(mut self, strategy: ChunkStrategy) -> Self {
        self.config.chunk_strategy = strategy;
        self
    }

    /// Set the number of candidates fetched per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the relevance threshold.
    pub fn min_score(mut self, threshold: f32) -> Self {
        self.config.min_score = threshold;
        self
    }

    /// Set the minimum answer length in characters.
    pub fn min_answer_chars(mut self, chars: usize) -> Self {
        self.config.min_answer_chars = chars;
        self
    }

    /// Set the generator timeout.
    ///
    /// The timeout is stored in whole seconds; a fractional part rounds up,
    /// so any non-zero duration stays non-zero.
    pub fn generation_timeout(mut self, timeout: Duration) -> Self {
        self.config.generation_timeout_secs =
            timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
        self
    }

    /// Set the options passed through to the generator.
    pub fn generation(mut self, options: GenerationOptions) -> Self {
        self.config.generation = options;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
