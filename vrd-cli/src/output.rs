//! Terminal rendering, document preview, and Markdown report export.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::NaiveDateTime;
use vrd_rag::Answer;

/// Characters of the document shown by `--preview`.
pub const PREVIEW_CHARS: usize = 1000;

/// Characters of each source passage shown under an answer.
const EXCERPT_CHARS: usize = 120;

/// The first `limit` characters of `text`, followed by `...` when truncated.
pub fn preview(text: &str, limit: usize) -> String {
    let mut chars = text.char_indices();
    match chars.nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Answer text followed by the passages it was grounded on.
pub fn render_answer(answer: &Answer) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}\n", answer.text);
    let _ = writeln!(out, "Sources ({}):", answer.document);
    for scored in &answer.context.chunks {
        let flat = scored.chunk.text.split_whitespace().collect::<Vec<_>>().join(" ");
        let excerpt = preview(&flat, EXCERPT_CHARS);
        let _ = writeln!(
            out,
            "  [{:.2}] #{} (chars {}..{}) {excerpt}",
            scored.score,
            scored.chunk.index + 1,
            scored.chunk.start,
            scored.chunk.end
        );
    }
    if answer.context.fallback {
        let _ = writeln!(
            out,
            "  note: no passage met the relevance threshold; the closest one was used"
        );
    }
    out
}

/// Markdown report with the query and answer reproduced verbatim.
pub fn render_report(answer: &Answer, generated_at: NaiveDateTime) -> String {
    let (query, text) = answer.report_fields();
    let mut out = String::new();
    let _ = writeln!(out, "# ICPE / VRD analysis report\n");
    let _ = writeln!(out, "Generated: {}\n", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "## Planned change\n\n{query}\n");
    let _ = writeln!(out, "## Analysis\n\n{text}\n");
    let _ = writeln!(out, "## Passages consulted\n");
    for scored in &answer.context.chunks {
        let _ = writeln!(
            out,
            "- passage {} (characters {}..{}), score {:.2}",
            scored.chunk.index + 1,
            scored.chunk.start,
            scored.chunk.end,
            scored.score
        );
    }
    out
}

pub fn write_report(path: &Path, answer: &Answer) -> Result<()> {
    let report = render_report(answer, chrono::Local::now().naive_local());
    std::fs::write(path, report)
        .with_context(|| format!("failed to write report to {}", path.display()))
}

/// Write the last answer of a chat to `path` for `/report <file>`.
///
/// Failures are returned to the caller so the chat loop can report them
/// and keep going.
pub fn export_last_answer(path: &str, last: Option<&Answer>) -> Result<String> {
    if path.is_empty() {
        bail!("usage: /report <file>");
    }
    let Some(answer) = last else {
        bail!("nothing to export yet");
    };
    write_report(Path::new(path), answer)?;
    Ok(format!("Report written to {path}"))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use vrd_rag::{Chunk, DocumentId, RetrievalResult, ScoredChunk};

    use super::*;

    fn answer() -> Answer {
        Answer {
            document: DocumentId::of("arrêté"),
            query: "Création d'un parking\nde 40 places".into(),
            text: "Article 12 : prévoir un séparateur d'hydrocarbures.".into(),
            context: RetrievalResult {
                chunks: vec![ScoredChunk {
                    chunk: Chunk { index: 2, text: "Article 12.\n  Les eaux".into(), start: 40, end: 62 },
                    score: 0.4321,
                }],
                fallback: true,
            },
        }
    }

    #[test]
    fn preview_truncates_on_characters() {
        assert_eq!(preview("éééé", 2), "éé...");
        assert_eq!(preview("éé", 2), "éé");
        assert_eq!(preview("", 2), "");
    }

    #[test]
    fn report_keeps_query_and_answer_verbatim() {
        let at = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap().and_hms_opt(14, 3, 12).unwrap();
        let report = render_report(&answer(), at);

        assert!(report.contains("Generated: 2026-10-19 14:03:12"));
        assert!(report.contains("## Planned change\n\nCréation d'un parking\nde 40 places\n"));
        assert!(report.contains("## Analysis\n\nArticle 12 : prévoir un séparateur d'hydrocarbures.\n"));
        assert!(report.contains("- passage 3 (characters 40..62), score 0.43"));
    }

    #[test]
    fn export_failures_are_returned_not_raised() {
        let answer = answer();
        let missing_dir = std::env::temp_dir().join("vrd-no-such-dir").join("rapport.md");
        let err = export_last_answer(missing_dir.to_str().unwrap(), Some(&answer)).unwrap_err();
        assert!(format!("{err:#}").contains("failed to write report"));

        assert!(export_last_answer("", Some(&answer)).is_err());
        assert!(export_last_answer("rapport.md", None).is_err());
    }

    #[test]
    fn export_writes_the_report() {
        let path = std::env::temp_dir().join(format!("vrd-report-{}.md", std::process::id()));
        let message = export_last_answer(path.to_str().unwrap(), Some(&answer())).unwrap();
        assert!(message.starts_with("Report written to"));

        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(written.contains("## Analysis\n\nArticle 12 : prévoir"));
    }

    #[test]
    fn rendered_answer_lists_sources() {
        let rendered = render_answer(&answer());
        assert!(rendered.starts_with("Article 12 : prévoir"));
        assert!(rendered.contains("[0.43] #3 (chars 40..62) Article 12. Les eaux"));
        assert!(rendered.contains("closest one was used"));
    }
}
