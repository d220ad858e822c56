//! Error types for the `vrd-rag` crate.

use thiserror::Error;

/// Errors that can occur while indexing a document or answering a query.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid chunking, retrieval, or generation parameters.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The document had no extractable text, so nothing could be indexed.
    #[error("Document contains no usable text")]
    EmptyDocument,

    /// The query was blank.
    #[error("Query must not be empty")]
    EmptyQuery,

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedder that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector did not match the index it was used with.
    #[error("Index error: {0}")]
    IndexError(String),

    /// Retrieval returned nothing for a non-empty index.
    ///
    /// This is a defect, not a user error: the fallback-to-best policy
    /// guarantees at least one chunk whenever the index has entries.
    #[error("Retrieval returned no chunks for a non-empty index")]
    RetrievalEmpty,

    /// The generator failed, timed out, or returned malformed output.
    #[error("Generation error ({generator}): {message}")]
    GenerationError {
        /// The generator that produced the error.
        generator: String,
        /// A description of the failure.
        message: String,
    },

    /// Generation succeeded but the cleaned answer is too short to act on.
    #[error("No usable answer: {length} characters after cleanup, at least {min_chars} required")]
    NoUsableAnswer {
        /// Length of the cleaned answer in characters.
        length: usize,
        /// Configured minimum length.
        min_chars: usize,
    },

    /// The session moved to another document while this result was in flight.
    #[error("Result for document {expected} discarded: session now holds {current}")]
    Superseded {
        /// The document the result was computed for.
        expected: String,
        /// The document the session currently holds, if any.
        current: String,
    },
}

impl RagError {
    /// Whether the user can act on this error (retry, switch modes, fix input).
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::ConfigError(_) | Self::IndexError(_) | Self::RetrievalEmpty)
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
