//! Cleanup of raw generator output.
//!
//! Some backends echo the prompt, or parts of it, before the answer. The
//! [`AnswerCleaner`] removes that scaffolding with an explicit rule set:
//!
//! 1. a verbatim echo of the whole prompt at the start of the output is cut
//! 2. lines opening with a scaffold label (question, context, example,
//!    instruction) are dropped
//! 3. lines opening with a `[Score x.xx]` context marker are dropped
//! 4. lines repeating a non-blank line of the prompt are dropped, which
//!    catches the unlabeled continuation lines of multi-line chunks and
//!    examples
//! 5. answer labels such as `Réponse:` are stripped, keeping the text after them
//!
//! This is pattern matching on free text and breaks if a backend changes its
//! echo format. Prefer backends that return the completion separately from the
//! prompt; the rules are then a no-op.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::prompt::PromptTemplate;

static SCORE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\[Score\s+-?\d+(?:\.\d+)?\]").expect("score marker pattern is valid")
});

/// Answer labels stripped from the start of a line.
const ANSWER_LABELS: [&str; 4] = ["Réponse:", "Reponse:", "Answer:", "Response:"];

/// Rule-based removal of echoed prompt scaffolding.
#[derive(Debug, Clone)]
pub struct AnswerCleaner {
    drop_labels: Vec<String>,
    strip_labels: Vec<String>,
}

impl AnswerCleaner {
    /// Create a cleaner dropping lines that start with any of `drop_labels`
    /// and removing any of `strip_labels` from line starts.
    ///
    /// Label matching ignores case and leading whitespace.
    pub fn new<D, S>(drop_labels: D, strip_labels: S) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        let lower = |label: String| label.trim().to_lowercase();
        Self {
            drop_labels: drop_labels.into_iter().map(Into::into).map(lower).collect(),
            strip_labels: strip_labels.into_iter().map(Into::into).map(lower).collect(),
        }
    }

    /// A cleaner for output produced from prompts built with `template`.
    pub fn for_template(template: &PromptTemplate) -> Self {
        Self::new(template.labels(), ANSWER_LABELS)
    }

    /// Isolate the answer in `raw`, given the `prompt` that produced it.
    pub fn clean(&self, prompt: &str, raw: &str) -> String {
        let body = raw.trim_start();
        let body = body.strip_prefix(prompt.trim()).unwrap_or(body);
        let echoed: HashSet<&str> =
            prompt.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

        let mut lines: Vec<&str> = Vec::new();
        for line in body.lines() {
            if self.is_scaffold(line) || echoed.contains(line.trim()) {
                continue;
            }
            let line = self.strip_answer_label(line);
            // Collapse runs of blank lines.
            if line.trim().is_empty() && lines.last().is_none_or(|l| l.trim().is_empty()) {
                continue;
            }
            lines.push(line);
        }
        lines.join("\n").trim().to_string()
    }

    fn is_scaffold(&self, line: &str) -> bool {
        if SCORE_MARKER.is_match(line) {
            return true;
        }
        let line = line.trim_start().to_lowercase();
        self.drop_labels.iter().any(|label| line.starts_with(label.as_str()))
    }

    fn strip_answer_label<'a>(&self, line: &'a str) -> &'a str {
        let trimmed = line.trim_start();
        for label in &self.strip_labels {
            // Labels are short ASCII-or-Latin prefixes; compare on a
            // char-boundary-safe prefix of the same char count.
            let count = label.chars().count();
            let end = trimmed.char_indices().nth(count).map_or(trimmed.len(), |(i, _)| i);
            if trimmed[..end].to_lowercase() == *label {
                return trimmed[end..].trim_start();
            }
        }
        line
    }
}

impl Default for AnswerCleaner {
    fn default() -> Self {
        Self::for_template(&PromptTemplate::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_echoed_scaffold_lines() {
        let cleaner = AnswerCleaner::default();
        let raw = "Question ICPE/VRD: déplacer le parking\n\
                   Contexte:\n\
                   [Score 0.81] Article 12 : les aires de stationnement...\n\
                   Consigne: Réponds de façon concise.\n\
                   Article 12 de l'arrêté du 2 février 1998. Installer un séparateur d'hydrocarbures.";
        assert_eq!(
            cleaner.clean("unrelated prompt", raw),
            "Article 12 de l'arrêté du 2 février 1998. Installer un séparateur d'hydrocarbures."
        );
    }

    #[test]
    fn strips_full_prompt_echo() {
        let cleaner = AnswerCleaner::default();
        let prompt = "Question ICPE/VRD: q\nContexte:\n[Score 0.50] texte multi\nligne\nConsigne: x";
        let raw = format!("{prompt}\nRéponse: Rubrique 2510, prévoir un dossier de modification.");
        assert_eq!(cleaner.clean(prompt, &raw), "Rubrique 2510, prévoir un dossier de modification.");
    }

    #[test]
    fn drops_partial_echo_of_multi_line_context() {
        let cleaner = AnswerCleaner::default();
        let prompt = "Question ICPE/VRD: nouveau parking\n\
                      Contexte:\n\
                      [Score 0.74] Article 12. Les eaux pluviales des parkings\n\
                      transitent par un séparateur d'hydrocarbures\n\
                      avant rejet au milieu naturel.\n\
                      Consigne: Réponds de façon concise.";
        let raw = "Contexte:\n\
                   [Score 0.74] Article 12. Les eaux pluviales des parkings\n\
                   transitent par un séparateur d'hydrocarbures\n\
                   avant rejet au milieu naturel.\n\
                   Consigne: Réponds de façon concise.\n\
                   Article 12 : installer un séparateur dimensionné.";
        assert_eq!(cleaner.clean(prompt, raw), "Article 12 : installer un séparateur dimensionné.");
    }

    #[test]
    fn drops_echoed_multi_line_example() {
        let template = PromptTemplate::default()
            .with_example("Article 4 de l'arrêté.\nAction : clôturer le bassin.");
        let cleaner = AnswerCleaner::for_template(&template);
        let prompt = format!(
            "{} q\n{}\n[Score 0.60] texte\n{} {}\n{} {}",
            template.question_label,
            template.context_label,
            template.example_label,
            template.example.as_deref().unwrap_or_default(),
            template.instruction_label,
            template.instruction
        );
        let raw = "Exemple: Article 4 de l'arrêté.\n\
                   Action : clôturer le bassin.\n\
                   Article 12 : séparateur requis.";
        assert_eq!(cleaner.clean(&prompt, raw), "Article 12 : séparateur requis.");
    }

    #[test]
    fn label_matching_ignores_case() {
        let cleaner = AnswerCleaner::default();
        assert_eq!(cleaner.clean("", "  consigne: echo\nANSWER: kept text"), "kept text");
    }

    #[test]
    fn leaves_plain_answers_untouched() {
        let cleaner = AnswerCleaner::default();
        let raw = "Selon l'article 4, le bassin doit être étanche.\n\nPrévoir un contrôle annuel.";
        assert_eq!(cleaner.clean("prompt", raw), raw);
    }

    #[test]
    fn collapses_blank_runs_left_by_dropped_lines() {
        let cleaner = AnswerCleaner::new(["Note:"], Vec::<String>::new());
        assert_eq!(cleaner.clean("", "a\n\nNote: x\n\n\nb"), "a\n\nb");
    }
}
