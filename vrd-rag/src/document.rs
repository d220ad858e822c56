//! Data types for documents, chunks, retrieval results, and answers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Content-derived identity of an ingested document.
///
/// Two documents with identical text share an id, which is what lets the
/// pipeline reuse an index across queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    /// Compute the id of a document from its text.
    pub fn of(text: &str) -> Self {
        Self(blake3::hash(text.as_bytes()).to_hex().to_string())
    }

    /// The full hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An abbreviated digest for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}

/// A contiguous segment of a document.
///
/// `start` and `end` are character offsets into the source text, so a chunk
/// can be traced back to its position regardless of multi-byte characters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Position of the chunk in the chunker's output.
    pub index: usize,
    /// The text content of the chunk.
    pub text: String,
    /// Character offset where the chunk starts.
    pub start: usize,
    /// Character offset one past the end of the chunk.
    pub end: usize,
}

impl Chunk {
    /// Length of the chunk in characters.
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

/// A retrieved [`Chunk`] paired with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity with the query (higher is more relevant).
    pub score: f32,
}

/// The ranked context retrieved for one query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    /// Chunks in descending score order.
    pub chunks: Vec<ScoredChunk>,
    /// Set when no candidate met the threshold and the best one was kept anyway.
    pub fallback: bool,
}

impl RetrievalResult {
    /// Number of retrieved chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether no chunk was retrieved.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The highest score in the result, if any.
    pub fn best_score(&self) -> Option<f32> {
        self.chunks.first().map(|c| c.score)
    }
}

/// A generated answer together with the context that grounded it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The document the answer was computed against.
    pub document: DocumentId,
    /// The question as asked.
    pub query: String,
    /// The cleaned answer text.
    pub text: String,
    /// The retrieved chunks given to the generator.
    pub context: RetrievalResult,
}

impl Answer {
    /// The `(query, answer)` pair consumed by report exporters, verbatim.
    pub fn report_fields(&self) -> (&str, &str) {
        (&self.query, &self.text)
    }
}
