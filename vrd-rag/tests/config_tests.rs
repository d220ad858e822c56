//! Tests for configuration defaults, validation, and prompt layout.

use std::time::Duration;

use vrd_rag::{
    Chunk, ChunkStrategy, GenerationOptions, PromptTemplate, RagConfig, RagError,
    RetrievalResult, ScoredChunk, compose,
};

#[test]
fn defaults_match_the_reference_setup() {
    let config = RagConfig::default();
    assert_eq!(config.chunk_size, 1024);
    assert_eq!(config.chunk_overlap, 80);
    assert_eq!(config.chunk_strategy, ChunkStrategy::Fixed);
    assert_eq!(config.top_k, 5);
    assert_eq!(config.min_score, 0.5);
    assert_eq!(config.generation_timeout(), Duration::from_secs(120));
    assert_eq!(config.generation.max_tokens, 256);
    assert_eq!(config.generation.num_candidates, 3);
    assert!(config.validate().is_ok());
}

#[test]
fn partial_json_fills_in_defaults() {
    let config: RagConfig = serde_json::from_str(
        r#"{ "chunk_size": 512, "chunk_strategy": "recursive", "generation": { "temperature": 0.2 } }"#,
    )
    .unwrap();
    assert_eq!(config.chunk_size, 512);
    assert_eq!(config.chunk_overlap, 80);
    assert_eq!(config.chunk_strategy, ChunkStrategy::Recursive);
    assert_eq!(config.generation, GenerationOptions::default().with_temperature(0.2));
}

#[test]
fn builder_validates() {
    let cases = [
        RagConfig::builder().chunk_size(0).build(),
        RagConfig::builder().chunk_size(100).chunk_overlap(100).build(),
        RagConfig::builder().top_k(0).build(),
        RagConfig::builder().min_score(1.5).build(),
        RagConfig::builder().min_score(f32::NAN).build(),
        RagConfig::builder().generation_timeout(Duration::ZERO).build(),
        RagConfig::builder().generation(GenerationOptions::default().with_max_tokens(0)).build(),
        RagConfig::builder().generation(GenerationOptions::default().with_temperature(3.0)).build(),
        RagConfig::builder()
            .generation(GenerationOptions::default().with_repetition_penalty(0.0))
            .build(),
    ];
    for case in cases {
        assert!(matches!(case, Err(RagError::ConfigError(_))), "{case:?}");
    }

    let config = RagConfig::builder().chunk_size(200).chunk_overlap(20).top_k(3).build().unwrap();
    assert_eq!((config.chunk_size, config.chunk_overlap, config.top_k), (200, 20, 3));
}

#[test]
fn sub_second_timeouts_round_up() {
    let config = RagConfig::builder().generation_timeout(Duration::from_millis(500)).build().unwrap();
    assert_eq!(config.generation_timeout(), Duration::from_secs(1));

    let config = RagConfig::builder().generation_timeout(Duration::from_millis(1900)).build().unwrap();
    assert_eq!(config.generation_timeout_secs, 2);

    let config = RagConfig::builder().generation_timeout(Duration::from_secs(30)).build().unwrap();
    assert_eq!(config.generation_timeout_secs, 30);
}

#[test]
fn recoverable_errors() {
    assert!(RagError::EmptyDocument.is_recoverable());
    assert!(RagError::NoUsableAnswer { length: 2, min_chars: 30 }.is_recoverable());
    assert!(!RagError::RetrievalEmpty.is_recoverable());
    assert!(!RagError::ConfigError("x".into()).is_recoverable());
}

fn scored(index: usize, text: &str, score: f32) -> ScoredChunk {
    ScoredChunk {
        chunk: Chunk { index, text: text.into(), start: 0, end: text.chars().count() },
        score,
    }
}

#[test]
fn prompt_lists_chunks_in_ranked_order() {
    let context = RetrievalResult {
        chunks: vec![
            scored(3, "Article 12. Séparateur d'hydrocarbures.", 0.812),
            scored(0, "Article 11. Voies étanches.\n", 0.5),
        ],
        fallback: false,
    };
    let prompt = compose("  Nouveau parking ", &context, &PromptTemplate::default());

    assert_eq!(
        prompt,
        "Question ICPE/VRD: Nouveau parking\n\
         Contexte:\n\
         [Score 0.81] Article 12. Séparateur d'hydrocarbures.\n\
         \n\
         [Score 0.50] Article 11. Voies étanches.\n\
         Consigne: Réponds de façon concise. Cite d'abord l'article ou la rubrique \
         applicable, puis propose une action corrective concrète."
    );
}

#[test]
fn prompt_includes_example_when_present() {
    let context = RetrievalResult { chunks: vec![scored(0, "Texte.", 0.9)], fallback: false };
    let template = PromptTemplate::english().with_example("Article 4: fence the basin.");
    let prompt = compose("q", &context, &template);

    assert!(prompt.starts_with("Question: q\nContext:\n[Score 0.90] Texte.\n"));
    assert!(prompt.contains("\nExample: Article 4: fence the basin.\nInstruction: "));
}
