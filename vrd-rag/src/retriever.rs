//! Turning documents into searchable context and queries into ranked chunks.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::chunking::Chunker;
use crate::config::RagConfig;
use crate::document::{Chunk, DocumentId, RetrievalResult, ScoredChunk};
use crate::embedding::{Embedder, normalize};
use crate::error::{RagError, Result};
use crate::index::SimilarityIndex;

/// A document split into chunks with their vectors indexed.
///
/// Immutable once built; a new document means a new `IndexedDocument`.
#[derive(Debug, Clone)]
pub struct IndexedDocument {
    id: DocumentId,
    chunks: Vec<Chunk>,
    index: SimilarityIndex,
}

impl IndexedDocument {
    /// Identity of the source document.
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    /// Chunks in document order; `chunks()[i]` is indexed at position `i`.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// The similarity index over the chunk vectors.
    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }
}

/// Orchestrates chunking, embedding, and index search.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    chunker: Arc<dyn Chunker>,
}

impl Retriever {
    /// Create a retriever from an embedder and a chunker.
    pub fn new(embedder: Arc<dyn Embedder>, chunker: Arc<dyn Chunker>) -> Self {
        Self { embedder, chunker }
    }

    /// Create a retriever using the chunking settings of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] for invalid chunk parameters.
    pub fn from_config(embedder: Arc<dyn Embedder>, config: &RagConfig) -> Result<Self> {
        let chunker = config.chunk_strategy.chunker(config.chunk_size, config.chunk_overlap)?;
        Ok(Self::new(embedder, Arc::from(chunker)))
    }

    /// The embedder used for chunks and queries.
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Chunk, embed, and index a document.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyDocument`] if the text is blank or yields no chunk
    /// - [`RagError::EmbeddingError`] if the embedder fails or returns
    ///   vectors inconsistent with the chunks
    pub async fn ingest(&self, text: &str) -> Result<IndexedDocument> {
        if text.trim().is_empty() {
            return Err(RagError::EmptyDocument);
        }
        let id = DocumentId::of(text);

        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            return Err(RagError::EmptyDocument);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let mut vectors = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| self.embedding_failure("chunk embedding failed", e))?;

        if vectors.len() != chunks.len() {
            return Err(self.embedding_failure(
                "chunk embedding failed",
                RagError::IndexError(format!(
                    "{} vectors returned for {} chunks",
                    vectors.len(),
                    chunks.len()
                )),
            ));
        }
        vectors.iter_mut().for_each(|v| normalize(v));

        let index = SimilarityIndex::build(vectors)
            .map_err(|e| self.embedding_failure("chunk embedding failed", e))?;

        info!(
            document = %id,
            chunk_count = chunks.len(),
            dimensions = index.dimensions(),
            "indexed document"
        );
        Ok(IndexedDocument { id, chunks, index })
    }

    /// Rank the chunks of `document` against `query`.
    ///
    /// Fetches the top `k` candidates, keeps those scoring at least
    /// `min_score`, and falls back to the single best candidate when none
    /// does, so the result is never empty for a non-empty index.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyQuery`] if `query` is blank
    /// - [`RagError::EmbeddingError`] if the query cannot be embedded
    /// - [`RagError::IndexError`] if the query vector does not match the index
    /// - [`RagError::RetrievalEmpty`] if the index yields nothing at all
    pub async fn retrieve(
        &self,
        document: &IndexedDocument,
        query: &str,
        k: usize,
        min_score: f32,
    ) -> Result<RetrievalResult> {
        if query.trim().is_empty() {
            return Err(RagError::EmptyQuery);
        }

        let mut query_vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| self.embedding_failure("query embedding failed", e))?;
        normalize(&mut query_vector);

        let hits = document
            .index
            .search(&query_vector, k.max(1))
            .inspect_err(|e| error!(document = %document.id, error = %e, "index search failed"))?;

        let Some(best) = hits.first().copied() else {
            error!(document = %document.id, "index returned no candidates");
            return Err(RagError::RetrievalEmpty);
        };

        let to_scored =
            |position: usize, score: f32| ScoredChunk { chunk: document.chunks[position].clone(), score };

        let kept: Vec<ScoredChunk> = hits
            .iter()
            .filter(|hit| hit.score >= min_score)
            .map(|hit| to_scored(hit.position, hit.score))
            .collect();

        let result = if kept.is_empty() {
            warn!(
                document = %document.id,
                best_score = best.score,
                min_score,
                "no chunk met the threshold, keeping the best candidate"
            );
            RetrievalResult { chunks: vec![to_scored(best.position, best.score)], fallback: true }
        } else {
            RetrievalResult { chunks: kept, fallback: false }
        };

        debug!(
            document = %document.id,
            candidates = hits.len(),
            kept = result.len(),
            best_score = best.score,
            "retrieval completed"
        );
        Ok(result)
    }

    fn embedding_failure(&self, context: &str, err: RagError) -> RagError {
        let provider = self.embedder.name().to_string();
        error!(provider = %provider, error = %err, "{context}");
        match err {
            RagError::EmbeddingError { .. } => err,
            other => RagError::EmbeddingError { provider, message: format!("{context}: {other}") },
        }
    }
}
