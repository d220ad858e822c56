//! # vrd-rag
//!
//! Retrieval-augmented answering core for the ICPE / VRD regulatory analyzer.
//!
//! Given the text of a regulatory document and a description of a planned
//! change to a site's roads and utilities networks (VRD), the pipeline finds
//! the passages of the document most relevant to the change and asks a text
//! generator for an answer grounded in them: the applicable provision, then a
//! concrete remedial action.
//!
//! ## Components
//!
//! - [`Chunker`]: [`FixedSizeChunker`] and [`RecursiveChunker`] split text into
//!   overlapping, position-indexed [`Chunk`]s
//! - [`Embedder`]: capability mapping text to vectors ([`HashingEmbedder`]
//!   offline, `OpenAIEmbedder` with the `openai` feature)
//! - [`SimilarityIndex`]: exact top-k inner-product search over unit vectors
//! - [`Retriever`]: ingest a document into an [`IndexedDocument`], rank its
//!   chunks for a query with a fallback-to-best relevance threshold
//! - [`compose`]: lay out the grounded prompt from a [`PromptTemplate`]
//! - [`Generator`]: capability producing text ([`CannedGenerator`] offline,
//!   `OpenAIChatGenerator` with the `openai` feature)
//! - [`AnswerCleaner`]: strip echoed prompt scaffolding from generator output
//! - [`AnswerPipeline`] + [`Session`]: coordinate the whole flow with a
//!   per-session index cache
//!
//! ## Features
//!
//! - `openai`: hosted embedder and chat generator over the OpenAI REST API
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vrd_rag::{AnswerPipeline, CannedGenerator, HashingEmbedder, Session};
//!
//! #[tokio::main]
//! async fn main() -> vrd_rag::Result<()> {
//!     let pipeline = AnswerPipeline::builder()
//!         .embedder(Arc::new(HashingEmbedder::default()))
//!         .build()?;
//!     let session = Session::new();
//!
//!     let text = std::fs::read_to_string("arrete.txt").unwrap_or_default();
//!     let answer = pipeline
//!         .answer(&session, &text, "Création d'un parking poids lourds", &CannedGenerator::demo())
//!         .await?;
//!     println!("{}", answer.text);
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod pipeline;
pub mod postprocess;
pub mod prompt;
pub mod retriever;

#[cfg(feature = "openai")]
pub mod openai;

pub use chunking::{ChunkStrategy, Chunker, FixedSizeChunker, RecursiveChunker, chunk};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Answer, Chunk, DocumentId, RetrievalResult, ScoredChunk};
pub use embedding::{Embedder, HashingEmbedder, normalize};
pub use error::{RagError, Result};
pub use generation::{CannedGenerator, GenerationOptions, Generator};
pub use index::{Hit, SimilarityIndex};
pub use pipeline::{AnswerPipeline, AnswerPipelineBuilder, Session, SessionStatus};
pub use postprocess::AnswerCleaner;
pub use prompt::{PromptTemplate, compose};
pub use retriever::{IndexedDocument, Retriever};

#[cfg(feature = "openai")]
pub use openai::{OpenAIChatGenerator, OpenAIEmbedder};
