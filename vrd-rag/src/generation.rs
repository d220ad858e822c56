//! Generator capability for producing text from a prompt.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Pass-through options for a generator call.
///
/// Backends ignore options they do not support.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationOptions {
    /// Upper bound on the number of generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature: 0 is deterministic and more factual, higher is more varied.
    pub temperature: f32,
    /// Number of candidates (beams) explored by backends that support it.
    pub num_candidates: u32,
    /// Penalty discouraging repeated text, when the backend supports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f32>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self { max_tokens: 256, temperature: 0.7, num_candidates: 3, repetition_penalty: None }
    }
}

impl GenerationOptions {
    /// Set the output token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the number of candidates (beams).
    pub fn with_num_candidates(mut self, num_candidates: u32) -> Self {
        self.num_candidates = num_candidates;
        self
    }

    /// Set the repetition penalty.
    pub fn with_repetition_penalty(mut self, penalty: f32) -> Self {
        self.repetition_penalty = Some(penalty);
        self
    }

    /// Check that options are within the ranges backends accept.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `max_tokens` or `num_candidates`
    /// is zero, `temperature` is outside `[0, 2]`, or the repetition penalty
    /// is not positive.
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(RagError::ConfigError("max_tokens must be greater than zero".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(RagError::ConfigError(format!(
                "temperature ({}) must be within [0, 2]",
                self.temperature
            )));
        }
        if self.num_candidates == 0 {
            return Err(RagError::ConfigError("num_candidates must be greater than zero".into()));
        }
        if let Some(penalty) = self.repetition_penalty.filter(|p| p.is_nan() || *p <= 0.0) {
            return Err(RagError::ConfigError(format!(
                "repetition_penalty ({penalty}) must be positive"
            )));
        }
        Ok(())
    }
}

/// A capability that produces free text from a prompt.
///
/// Implementations wrap a local model or a hosted chat API. They should
/// return only the completion; output that echoes the prompt is cleaned up by
/// the pipeline, but that cleanup is best-effort.
///
/// # Example
///
/// ```rust,ignore
/// use vrd_rag::{CannedGenerator, GenerationOptions, Generator};
///
/// let generator = CannedGenerator::demo();
/// let text = generator.generate("Question ICPE/VRD: ...", &GenerationOptions::default()).await?;
/// ```
#[async_trait]
pub trait Generator: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;
}

/// A generator returning a fixed answer, for the offline demo mode.
#[derive(Debug, Clone)]
pub struct CannedGenerator {
    answer: String,
}

impl CannedGenerator {
    /// Create a generator that always returns `answer`.
    pub fn new(answer: impl Into<String>) -> Self {
        Self { answer: answer.into() }
    }

    /// The stock demo answer.
    pub fn demo() -> Self {
        Self::new(
            "Rubrique ICPE 2510 et article 11 de l'arrêté ministériel du 2 février 1998 : \
             toute modification des voiries et réseaux divers doit être portée à la \
             connaissance du préfet avant sa réalisation. Action corrective : transmettre \
             un porter-à-connaissance décrivant la modification et vérifier la capacité \
             du bassin de rétention des eaux pluviales.",
        )
    }
}

#[async_trait]
impl Generator for CannedGenerator {
    fn name(&self) -> &str {
        "canned"
    }

    async fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<String> {
        Ok(self.answer.clone())
    }
}
