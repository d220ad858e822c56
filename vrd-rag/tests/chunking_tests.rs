//! Tests for fixed-size and recursive chunking.

use proptest::prelude::*;
use vrd_rag::{Chunk, Chunker, FixedSizeChunker, RagError, RecursiveChunker, chunk};

fn texts(chunks: &[Chunk]) -> Vec<&str> {
    chunks.iter().map(|c| c.text.as_str()).collect()
}

#[test]
fn fixed_chunks_with_overlap() {
    let chunks = chunk("ABCDEFGHIJ", 4, 1).unwrap();
    assert_eq!(texts(&chunks), ["ABCD", "DEFG", "GHIJ"]);
    assert_eq!(chunks.iter().map(|c| c.index).collect::<Vec<_>>(), [0, 1, 2]);
    assert_eq!((chunks[2].start, chunks[2].end), (6, 10));
}

#[test]
fn final_chunk_may_be_shorter() {
    let chunks = chunk("ABCDEFGH", 5, 2).unwrap();
    assert_eq!(texts(&chunks), ["ABCDE", "DEFGH"]);

    let chunks = chunk("ABCDEFGHI", 4, 0).unwrap();
    assert_eq!(texts(&chunks), ["ABCD", "EFGH", "I"]);
}

#[test]
fn empty_text_yields_no_chunks() {
    assert!(chunk("", 4, 1).unwrap().is_empty());
    assert!(RecursiveChunker::new(4, 1).unwrap().chunk("").is_empty());
}

#[test]
fn overlap_not_smaller_than_size_is_rejected() {
    assert!(matches!(chunk("abc", 4, 4), Err(RagError::ConfigError(_))));
    assert!(matches!(chunk("abc", 4, 9), Err(RagError::ConfigError(_))));
    assert!(matches!(chunk("abc", 0, 0), Err(RagError::ConfigError(_))));
    assert!(matches!(RecursiveChunker::new(10, 10), Err(RagError::ConfigError(_))));
}

#[test]
fn sizes_count_characters_not_bytes() {
    let chunks = chunk("éàçüôé", 4, 2).unwrap();
    assert_eq!(texts(&chunks), ["éàçü", "çüôé"]);
    assert_eq!(chunks[1].char_len(), 4);
}

#[test]
fn recursive_prefers_paragraph_boundaries() {
    let text = "Article 1. Les voies sont étanches.\n\nArticle 2. Les eaux pluviales sont collectées.";
    let chunker = RecursiveChunker::new(50, 0).unwrap();
    let chunks = chunker.chunk(text);

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].text.trim_end(), "Article 1. Les voies sont étanches.");
    assert_eq!(chunks[1].text, "Article 2. Les eaux pluviales sont collectées.");
}

#[test]
fn recursive_carries_trailing_pieces_as_overlap() {
    let chunker = RecursiveChunker::new(12, 6).unwrap();
    let chunks = chunker.chunk("aaa bbb ccc ddd eee");

    assert_eq!(texts(&chunks), ["aaa bbb ccc ", "ccc ddd eee"]);
}

#[test]
fn recursive_splits_unbroken_runs() {
    let chunker = RecursiveChunker::new(4, 0).unwrap();
    let chunks = chunker.chunk("ABCDEFGHIJ");
    assert_eq!(texts(&chunks), ["ABCD", "EFGH", "IJ"]);
}

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zé \n.]{0,200}"
}

fn arb_params() -> impl Strategy<Value = (usize, usize)> {
    (1usize..40).prop_flat_map(|size| (Just(size), 0..size))
}

/// *For any* text and valid `(size, overlap)`, fixed-size chunks cover the
/// text without gaps, reproduce it at their offsets, and consecutive chunks
/// share exactly `overlap` characters.
mod prop_fixed_chunking {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn covers_text_with_exact_overlap(text in arb_text(), (size, overlap) in arb_params()) {
            let chars: Vec<char> = text.chars().collect();
            let chunks = chunk(&text, size, overlap).unwrap();

            if chars.is_empty() {
                prop_assert!(chunks.is_empty());
                return Ok(());
            }

            prop_assert_eq!(chunks[0].start, 0);
            prop_assert_eq!(chunks.last().unwrap().end, chars.len());

            for (i, c) in chunks.iter().enumerate() {
                prop_assert_eq!(c.index, i);
                prop_assert!(c.char_len() <= size);
                let expected: String = chars[c.start..c.end].iter().collect();
                prop_assert_eq!(&c.text, &expected);
            }
            for pair in chunks.windows(2) {
                prop_assert_eq!(pair[0].end - pair[1].start, overlap);
                prop_assert_eq!(pair[0].char_len(), size);
            }
        }

        #[test]
        fn is_deterministic(text in arb_text(), (size, overlap) in arb_params()) {
            prop_assert_eq!(chunk(&text, size, overlap).unwrap(), chunk(&text, size, overlap).unwrap());
        }

        #[test]
        fn recursive_chunks_stay_in_bounds(text in arb_text(), (size, overlap) in arb_params()) {
            let chars: Vec<char> = text.chars().collect();
            let chunks = RecursiveChunker::new(size, overlap).unwrap().chunk(&text);

            let mut last_start = 0;
            for (i, c) in chunks.iter().enumerate() {
                prop_assert_eq!(c.index, i);
                prop_assert!(c.char_len() <= size);
                prop_assert!(c.start >= last_start);
                prop_assert!(!c.text.trim().is_empty());
                let expected: String = chars[c.start..c.end].iter().collect();
                prop_assert_eq!(&c.text, &expected);
                last_start = c.start;
            }
        }
    }
}

#[test]
fn fixed_chunker_matches_free_function() {
    let chunker = FixedSizeChunker::new(7, 3).unwrap();
    let text = "Rubrique 2510 : exploitation de carrières.";
    assert_eq!(chunker.chunk(text), chunk(text, 7, 3).unwrap());
}
