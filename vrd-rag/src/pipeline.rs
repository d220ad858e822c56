//! Answer pipeline and per-user session state.
//!
//! The [`AnswerPipeline`] coordinates one "analyze" action: make sure the
//! document is indexed (reusing the session's index when the text is
//! unchanged), retrieve context, compose the prompt, call the generator, and
//! clean its output into an [`Answer`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vrd_rag::{AnswerPipeline, CannedGenerator, HashingEmbedder, RagConfig, Session};
//!
//! let pipeline = AnswerPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedder(Arc::new(HashingEmbedder::default()))
//!     .build()?;
//!
//! let session = Session::new();
//! let answer = pipeline
//!     .answer(&session, &document_text, "Ajout d'un parking de 40 places", &CannedGenerator::demo())
//!     .await?;
//! println!("{}", answer.text);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::chunking::Chunker;
use crate::config::RagConfig;
use crate::document::{Answer, DocumentId};
use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::generation::Generator;
use crate::postprocess::AnswerCleaner;
use crate::prompt::{PromptTemplate, compose};
use crate::retriever::{IndexedDocument, Retriever};

/// Coarse lifecycle of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No document has been ingested yet.
    NoDocument,
    /// A document is indexed and cached.
    Indexed,
    /// The cached document has answered at least one query.
    Answered,
}

#[derive(Debug, Default)]
enum SessionState {
    #[default]
    NoDocument,
    Indexed(Arc<IndexedDocument>),
    Answered {
        document: Arc<IndexedDocument>,
        answer: Answer,
    },
}

impl SessionState {
    fn document(&self) -> Option<&Arc<IndexedDocument>> {
        match self {
            Self::NoDocument => None,
            Self::Indexed(document) | Self::Answered { document, .. } => Some(document),
        }
    }

    fn describe(&self) -> String {
        self.document().map_or_else(|| "no document".to_string(), |d| d.id().to_string())
    }
}

#[derive(Debug, Default)]
struct SessionInner {
    state: SessionState,
    /// Ticket of the most recent ingestion request applied to `state`.
    ticket: u64,
}

/// The state one user accumulates across queries: the indexed document and
/// the latest answer.
///
/// Ingesting a different document replaces the cached index wholesale. Every
/// ingestion request takes a ticket when it starts; a build that finishes
/// after a newer request has been applied is discarded, as is an answer
/// computed for a document the session no longer holds.
#[derive(Debug, Default)]
pub struct Session {
    inner: RwLock<SessionInner>,
    next_ticket: AtomicU64,
}

impl Session {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle status.
    pub async fn status(&self) -> SessionStatus {
        match self.inner.read().await.state {
            SessionState::NoDocument => SessionStatus::NoDocument,
            SessionState::Indexed(_) => SessionStatus::Indexed,
            SessionState::Answered { .. } => SessionStatus::Answered,
        }
    }

    /// Identity of the cached document, if any.
    pub async fn document_id(&self) -> Option<DocumentId> {
        self.inner.read().await.state.document().map(|d| d.id().clone())
    }

    /// The cached indexed document, if any.
    pub async fn indexed_document(&self) -> Option<Arc<IndexedDocument>> {
        self.inner.read().await.state.document().cloned()
    }

    /// The latest answer for the cached document, if any.
    pub async fn last_answer(&self) -> Option<Answer> {
        match &self.inner.read().await.state {
            SessionState::Answered { answer, .. } => Some(answer.clone()),
            _ => None,
        }
    }

    /// Drop the cached document and answer.
    ///
    /// Ingestions still in flight are discarded when they finish.
    pub async fn reset(&self) {
        let ticket = self.issue_ticket();
        let mut inner = self.inner.write().await;
        inner.state = SessionState::NoDocument;
        inner.ticket = inner.ticket.max(ticket);
    }

    fn issue_ticket(&self) -> u64 {
        self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn reuse(&self, id: &DocumentId, ticket: u64) -> Option<Arc<IndexedDocument>> {
        let mut inner = self.inner.write().await;
        let document = inner.state.document().filter(|d| d.id() == id).cloned()?;
        inner.ticket = inner.ticket.max(ticket);
        Some(document)
    }

    async fn install(&self, document: Arc<IndexedDocument>, ticket: u64) -> Result<()> {
        let mut inner = self.inner.write().await;
        if ticket < inner.ticket {
            warn!(
                document = %document.id(),
                current = %inner.state.describe(),
                "discarding index built for a superseded document"
            );
            return Err(RagError::Superseded {
                expected: document.id().to_string(),
                current: inner.state.describe(),
            });
        }
        if let Some(previous) = inner.state.document() {
            info!(previous = %previous.id(), document = %document.id(), "replacing session document");
        }
        inner.state = SessionState::Indexed(document);
        inner.ticket = ticket;
        Ok(())
    }

    async fn record(&self, answer: Answer) -> Result<()> {
        let mut inner = self.inner.write().await;
        let document = match inner.state.document() {
            Some(document) if document.id() == &answer.document => Arc::clone(document),
            _ => {
                warn!(
                    document = %answer.document,
                    current = %inner.state.describe(),
                    "discarding answer for a superseded document"
                );
                return Err(RagError::Superseded {
                    expected: answer.document.to_string(),
                    current: inner.state.describe(),
                });
            }
        };
        inner.state = SessionState::Answered { document, answer };
        Ok(())
    }
}

/// The top-level coordinator turning `(document, query)` into an [`Answer`].
///
/// Construct one via [`AnswerPipeline::builder()`]. The pipeline itself is
/// stateless across users; per-user state lives in a [`Session`]. The
/// generator is supplied per call so callers can switch between an offline
/// backend and a hosted one without rebuilding the pipeline.
pub struct AnswerPipeline {
    config: RagConfig,
    retriever: Retriever,
    template: PromptTemplate,
    cleaner: AnswerCleaner,
}

impl AnswerPipeline {
    /// Create a new [`AnswerPipelineBuilder`].
    pub fn builder() -> AnswerPipelineBuilder {
        AnswerPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the prompt template.
    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Return a reference to the retriever.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Make `text` the session's document, building its index unless the
    /// session already holds the same text.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyDocument`] if the text is blank; the session is left unchanged
    /// - [`RagError::EmbeddingError`] if chunk embedding fails
    /// - [`RagError::Superseded`] if a newer ingestion was applied while this one was building
    pub async fn ingest(&self, session: &Session, text: &str) -> Result<Arc<IndexedDocument>> {
        if text.trim().is_empty() {
            return Err(RagError::EmptyDocument);
        }
        let id = DocumentId::of(text);
        let ticket = session.issue_ticket();

        if let Some(document) = session.reuse(&id, ticket).await {
            debug!(document = %id, "index cache hit");
            return Ok(document);
        }

        let document = Arc::new(self.retriever.ingest(text).await?);
        session.install(Arc::clone(&document), ticket).await?;
        Ok(document)
    }

    /// Answer `query` against `document_text`.
    ///
    /// Runs ingest (cached) → retrieve → compose → generate → clean. The
    /// generator is called once; retrying is left to the caller.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyQuery`] if `query` is blank
    /// - [`RagError::EmptyDocument`] if the document has no usable text
    /// - [`RagError::EmbeddingError`] if the embedder fails
    /// - [`RagError::GenerationError`] if the generator fails, times out, or
    ///   returns nothing
    /// - [`RagError::NoUsableAnswer`] if the cleaned answer is too short
    /// - [`RagError::Superseded`] if the session switched documents meanwhile
    pub async fn answer(
        &self,
        session: &Session,
        document_text: &str,
        query: &str,
        generator: &dyn Generator,
    ) -> Result<Answer> {
        if query.trim().is_empty() {
            return Err(RagError::EmptyQuery);
        }
        let document = self.ingest(session, document_text).await?;
        self.answer_indexed(session, document, query, generator).await
    }

    /// Answer `query` against the document the session already holds.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyDocument`] if the session holds no document,
    /// otherwise the same errors as [`answer`](Self::answer).
    pub async fn ask(
        &self,
        session: &Session,
        query: &str,
        generator: &dyn Generator,
    ) -> Result<Answer> {
        if query.trim().is_empty() {
            return Err(RagError::EmptyQuery);
        }
        let document = session.indexed_document().await.ok_or(RagError::EmptyDocument)?;
        self.answer_indexed(session, document, query, generator).await
    }

    async fn answer_indexed(
        &self,
        session: &Session,
        document: Arc<IndexedDocument>,
        query: &str,
        generator: &dyn Generator,
    ) -> Result<Answer> {
        let context = self
            .retriever
            .retrieve(&document, query, self.config.top_k, self.config.min_score)
            .await?;
        if context.is_empty() {
            return Err(RagError::RetrievalEmpty);
        }

        let prompt = compose(query, &context, &self.template);
        let raw = self.generate(generator, &prompt).await?;

        let text = self.cleaner.clean(&prompt, &raw);
        let length = text.chars().count();
        if length < self.config.min_answer_chars {
            warn!(
                generator = generator.name(),
                length,
                min_chars = self.config.min_answer_chars,
                "answer too short after cleanup"
            );
            return Err(RagError::NoUsableAnswer {
                length,
                min_chars: self.config.min_answer_chars,
            });
        }

        let answer = Answer {
            document: document.id().clone(),
            query: query.to_string(),
            text,
            context,
        };
        session.record(answer.clone()).await?;

        info!(
            document = %answer.document,
            generator = generator.name(),
            context_chunks = answer.context.len(),
            fallback = answer.context.fallback,
            answer_chars = length,
            "answered query"
        );
        Ok(answer)
    }

    async fn generate(&self, generator: &dyn Generator, prompt: &str) -> Result<String> {
        let name = generator.name().to_string();
        let timeout = self.config.generation_timeout();
        debug!(generator = %name, prompt_chars = prompt.chars().count(), "calling generator");

        let raw = match tokio::time::timeout(
            timeout,
            generator.generate(prompt, &self.config.generation),
        )
        .await
        {
            Err(_) => {
                error!(generator = %name, timeout_secs = timeout.as_secs(), "generation timed out");
                return Err(RagError::GenerationError {
                    generator: name,
                    message: format!("timed out after {}s", timeout.as_secs()),
                });
            }
            Ok(Err(e)) => {
                error!(generator = %name, error = %e, "generation failed");
                return Err(match e {
                    RagError::GenerationError { .. } => e,
                    other => RagError::GenerationError { generator: name, message: other.to_string() },
                });
            }
            Ok(Ok(raw)) => raw,
        };

        if raw.trim().is_empty() {
            error!(generator = %name, "generator returned empty output");
            return Err(RagError::GenerationError {
                generator: name,
                message: "empty output".into(),
            });
        }
        Ok(raw)
    }
}

/// Builder for constructing an [`AnswerPipeline`].
///
/// Only the embedder is required. The config defaults to
/// [`RagConfig::default()`], the chunker to the configured strategy, the
/// template to [`PromptTemplate::default()`], and the cleaner to one matching
/// the template.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = AnswerPipeline::builder()
///     .config(RagConfig::builder().min_score(0.2).build()?)
///     .embedder(Arc::new(embedder))
///     .template(PromptTemplate::english())
///     .build()?;
/// ```
#[derive(Default)]
pub struct AnswerPipelineBuilder {
    config: Option<RagConfig>,
    embedder: Option<Arc<dyn Embedder>>,
    chunker: Option<Arc<dyn Chunker>>,
    template: Option<PromptTemplate>,
    cleaner: Option<AnswerCleaner>,
}

impl AnswerPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedder.
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Override the chunker built from the config's chunk settings.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the prompt template.
    pub fn template(mut self, template: PromptTemplate) -> Self {
        self.template = Some(template);
        self
    }

    /// Override the answer cleaner derived from the template.
    pub fn cleaner(mut self, cleaner: AnswerCleaner) -> Self {
        self.cleaner = Some(cleaner);
        self
    }

    /// Build the [`AnswerPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the embedder is missing or the
    /// config is invalid.
    pub fn build(self) -> Result<AnswerPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedder =
            self.embedder.ok_or_else(|| RagError::ConfigError("embedder is required".into()))?;

        let retriever = match self.chunker {
            Some(chunker) => Retriever::new(embedder, chunker),
            None => Retriever::from_config(embedder, &config)?,
        };
        let template = self.template.unwrap_or_default();
        let cleaner = self.cleaner.unwrap_or_else(|| AnswerCleaner::for_template(&template));

        Ok(AnswerPipeline { config, retriever, template, cleaner })
    }
}
