//! Grounded prompt composition.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::document::RetrievalResult;

/// Labels and instruction used to lay out a grounded prompt.
///
/// The default template is French, matching the ICPE / VRD audience. The
/// labels double as the scaffold markers the answer cleaner strips from
/// generator output, see [`AnswerCleaner::for_template`](crate::AnswerCleaner::for_template).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PromptTemplate {
    /// Label preceding the user's question.
    pub question_label: String,
    /// Label on the line opening the context block.
    pub context_label: String,
    /// Label preceding the worked example, when there is one.
    pub example_label: String,
    /// Optional worked example showing the expected answer shape.
    pub example: Option<String>,
    /// Label preceding the instruction.
    pub instruction_label: String,
    /// Required answer shape.
    pub instruction: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            question_label: "Question ICPE/VRD:".into(),
            context_label: "Contexte:".into(),
            example_label: "Exemple:".into(),
            example: None,
            instruction_label: "Consigne:".into(),
            instruction: "Réponds de façon concise. Cite d'abord l'article ou la rubrique \
                          applicable, puis propose une action corrective concrète."
                .into(),
        }
    }
}

impl PromptTemplate {
    /// An English template with the same structure as the default.
    pub fn english() -> Self {
        Self {
            question_label: "Question:".into(),
            context_label: "Context:".into(),
            example_label: "Example:".into(),
            example: None,
            instruction_label: "Instruction:".into(),
            instruction: "Answer concisely. First cite the applicable provision, then \
                          propose a concrete remedial action."
                .into(),
        }
    }

    /// Attach a worked example to the template.
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }

    /// Labels that open scaffold lines in a composed prompt.
    pub fn labels(&self) -> [&str; 4] {
        [
            self.question_label.as_str(),
            self.context_label.as_str(),
            self.example_label.as_str(),
            self.instruction_label.as_str(),
        ]
    }
}

/// Marker prefixed to every chunk in the context block.
pub(crate) fn score_marker(score: f32) -> String {
    format!("[Score {score:.2}]")
}

/// Build the prompt sent to the generator.
///
/// Chunks appear in the ranked order of `context`, each prefixed with its
/// score and separated by a blank line, between the question and the
/// instruction.
///
/// # Example
///
/// ```rust
/// use vrd_rag::{compose, PromptTemplate, RetrievalResult};
///
/// let prompt = compose("Ajout d'un bassin", &RetrievalResult::default(), &PromptTemplate::default());
/// assert!(prompt.starts_with("Question ICPE/VRD: Ajout d'un bassin\nContexte:\n"));
/// ```
pub fn compose(query: &str, context: &RetrievalResult, template: &PromptTemplate) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "{} {}", template.question_label, query.trim());
    let _ = writeln!(prompt, "{}", template.context_label);

    let blocks: Vec<String> = context
        .chunks
        .iter()
        .map(|scored| format!("{} {}", score_marker(scored.score), scored.chunk.text.trim()))
        .collect();
    let _ = writeln!(prompt, "{}", blocks.join("\n\n"));

    if let Some(example) = &template.example {
        let _ = writeln!(prompt, "{} {}", template.example_label, example.trim());
    }
    let _ = write!(prompt, "{} {}", template.instruction_label, template.instruction);
    prompt
}
