//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`]: sliding character window with a fixed overlap
//! - [`RecursiveChunker`]: splits on paragraph, line, sentence, then word
//!   boundaries and merges the pieces back up to the target size
//!
//! Sizes and offsets are counted in characters (Unicode scalar values), never
//! bytes, so accented text is never split inside a code point.

use std::collections::VecDeque;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::document::Chunk;
use crate::error::{RagError, Result};

/// A strategy for splitting document text into ordered chunks.
pub trait Chunker: Send + Sync {
    /// Split `text` into chunks in document order.
    ///
    /// Returns an empty `Vec` if `text` is empty.
    fn chunk(&self, text: &str) -> Vec<Chunk>;
}

/// Which [`Chunker`] the pipeline builds from its configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// [`FixedSizeChunker`].
    #[default]
    Fixed,
    /// [`RecursiveChunker`].
    Recursive,
}

impl ChunkStrategy {
    /// Build the chunker for this strategy.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `size == 0` or `overlap >= size`.
    pub fn chunker(self, size: usize, overlap: usize) -> Result<Box<dyn Chunker>> {
        Ok(match self {
            Self::Fixed => Box::new(FixedSizeChunker::new(size, overlap)?),
            Self::Recursive => Box::new(RecursiveChunker::new(size, overlap)?),
        })
    }
}

/// Split `text` into fixed-size overlapping chunks.
///
/// Each chunk spans `[start, min(start + size, len))` characters and `start`
/// advances by `size - overlap` until a chunk reaches the end of the text.
/// Consecutive chunks share exactly `overlap` characters; only the last chunk
/// may be shorter than `size`.
///
/// # Errors
///
/// Returns [`RagError::ConfigError`] if `size == 0` or `overlap >= size`; such
/// parameters would never advance the window.
pub fn chunk(text: &str, size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    Ok(FixedSizeChunker::new(size, overlap)?.chunk(text))
}

fn validate(size: usize, overlap: usize) -> Result<()> {
    if size == 0 {
        return Err(RagError::ConfigError("chunk size must be greater than zero".into()));
    }
    if overlap >= size {
        return Err(RagError::ConfigError(format!(
            "chunk overlap ({overlap}) must be less than chunk size ({size})"
        )));
    }
    Ok(())
}

/// Byte offset of every character boundary in `text`, including the end.
///
/// Index `i` holds the byte offset of character `i`; the last entry is
/// `text.len()`.
fn char_boundaries(text: &str) -> Vec<usize> {
    text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect()
}

/// Splits text into fixed-size chunks by character count with a fixed overlap.
///
/// # Example
///
/// ```rust
/// use vrd_rag::{Chunker, FixedSizeChunker};
///
/// let chunker = FixedSizeChunker::new(4, 1).unwrap();
/// let texts: Vec<String> = chunker.chunk("ABCDEFGHIJ").into_iter().map(|c| c.text).collect();
/// assert_eq!(texts, ["ABCD", "DEFG", "GHIJ"]);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `chunk_size == 0` or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let bounds = char_boundaries(text);
        let len = bounds.len() - 1;
        let step = self.chunk_size - self.chunk_overlap;

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < len {
            let end = (start + self.chunk_size).min(len);
            chunks.push(Chunk {
                index: chunks.len(),
                text: text[bounds[start]..bounds[end]].to_string(),
                start,
                end,
            });
            if end == len {
                break;
            }
            start += step;
        }
        chunks
    }
}

/// Boundaries tried in order when a segment is too long.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Splits text hierarchically: paragraphs → lines → sentences → words.
///
/// Segments longer than `chunk_size` are split at the next boundary level,
/// down to a hard character split. Pieces are then merged back into chunks
/// of at most `chunk_size` characters, each new chunk starting with up to
/// `chunk_overlap` trailing characters of whole pieces from the previous one.
/// Chunks made only of whitespace are dropped.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `chunk_size == 0` or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Split a byte range of `text` into pieces of at most `chunk_size` characters.
    fn split(
        &self,
        text: &str,
        range: Range<usize>,
        separators: &[&str],
        out: &mut Vec<Range<usize>>,
    ) {
        let slice = &text[range.clone()];
        if slice.chars().count() <= self.chunk_size {
            out.push(range);
            return;
        }

        let Some((separator, rest)) = separators.split_first() else {
            // No boundary left: cut every `chunk_size` characters.
            let mut piece_start = range.start;
            for (n, (offset, _)) in slice.char_indices().enumerate() {
                if n > 0 && n % self.chunk_size == 0 {
                    out.push(piece_start..range.start + offset);
                    piece_start = range.start + offset;
                }
            }
            out.push(piece_start..range.end);
            return;
        };

        let mut piece_start = 0;
        for (pos, matched) in slice.match_indices(separator) {
            let piece_end = pos + matched.len();
            self.split(text, range.start + piece_start..range.start + piece_end, rest, out);
            piece_start = piece_end;
        }
        if piece_start < slice.len() {
            self.split(text, range.start + piece_start..range.end, rest, out);
        }
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut pieces = Vec::new();
        self.split(text, 0..text.len(), &SEPARATORS, &mut pieces);

        let bounds = char_boundaries(text);
        let to_char = |byte: usize| bounds.binary_search(&byte).unwrap_or_else(|i| i);

        let mut spans: Vec<Range<usize>> = Vec::new();
        let mut window: VecDeque<Range<usize>> = VecDeque::new();
        let mut window_len = 0;

        for piece in pieces {
            let piece = to_char(piece.start)..to_char(piece.end);
            let piece_len = piece.len();

            if !window.is_empty() && window_len + piece_len > self.chunk_size {
                if let (Some(first), Some(last)) = (window.front(), window.back()) {
                    spans.push(first.start..last.end);
                }
                while window_len > self.chunk_overlap
                    || (window_len > 0 && window_len + piece_len > self.chunk_size)
                {
                    if let Some(dropped) = window.pop_front() {
                        window_len -= dropped.len();
                    }
                }
            }
            window_len += piece_len;
            window.push_back(piece);
        }
        if let (Some(first), Some(last)) = (window.front(), window.back()) {
            spans.push(first.start..last.end);
        }

        spans
            .into_iter()
            .map(|span| (text[bounds[span.start]..bounds[span.end]].to_string(), span))
            .filter(|(chunk_text, _)| !chunk_text.trim().is_empty())
            .enumerate()
            .map(|(index, (text, span))| Chunk { index, text, start: span.start, end: span.end })
            .collect()
    }
}
