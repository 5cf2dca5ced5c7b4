//! Post-processing of raw model text.
//!
//! Models like to decorate their answers: a `<think>` block from reasoning
//! models, a leading label such as `Corrected:` or `German translation:`,
//! fenced code blocks, and inline backticks. [`clean_response`] removes all
//! of these and rejects answers that turn out to be empty.

use crate::{
    error::{Result, RewriteError},
    operation::Operation,
};
use regex::Regex;
use std::sync::OnceLock;

/// Labels stripped from the start of a response, tested in this order.
pub const KNOWN_LABELS: [&str; 13] = [
    "Rewritten:",
    "Corrected:",
    "Simplified:",
    "Expanded:",
    "Formal version:",
    "Casual version:",
    "Bullet points:",
    "Paragraph:",
    "Cleaned:",
    "Translation:",
    "Text:",
    "Output:",
    "Result:",
];

static TRANSLATION_LABEL: OnceLock<Regex> = OnceLock::new();
static FENCED_BLOCK: OnceLock<Regex> = OnceLock::new();
static INLINE_CODE: OnceLock<Regex> = OnceLock::new();

fn translation_label() -> &'static Regex {
    TRANSLATION_LABEL.get_or_init(|| {
        Regex::new(r"(?i)^\p{L}+[ \t]+translation[ \t]*:")
            .expect("Invalid translation label pattern")
    })
}

fn fenced_block() -> &'static Regex {
    FENCED_BLOCK.get_or_init(|| Regex::new(r"(?s)```.*?```").expect("Invalid fenced block pattern"))
}

fn inline_code() -> &'static Regex {
    INLINE_CODE.get_or_init(|| Regex::new(r"`+([^`\n]+?)`+").expect("Invalid inline code pattern"))
}

/// Split `<think>...</think>` blocks out of a response.
///
/// Returns the joined thinking text (if any) and the remaining answer. An
/// unclosed `<think>` swallows everything after it.
pub fn extract_thinking(text: &str) -> (Option<String>, String) {
    const OPEN: &str = "<think>";
    const CLOSE: &str = "</think>";

    let mut thoughts = Vec::new();
    let mut answer = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        answer.push_str(&rest[..start]);
        let inner = &rest[start + OPEN.len()..];
        match inner.find(CLOSE) {
            Some(end) => {
                thoughts.push(inner[..end].trim());
                rest = &inner[end + CLOSE.len()..];
            }
            None => {
                thoughts.push(inner.trim());
                rest = "";
            }
        }
    }
    answer.push_str(rest);

    let thinking = thoughts
        .into_iter()
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    let thinking = if thinking.is_empty() {
        None
    } else {
        Some(thinking)
    };

    (thinking, answer)
}

/// Remove a single leading label, if present.
///
/// A `<Language> translation:` label is tried first, then [`KNOWN_LABELS`].
pub fn strip_label(text: &str) -> &str {
    if let Some(found) = translation_label().find(text) {
        return text[found.end()..].trim_start();
    }

    for label in KNOWN_LABELS {
        let matches = text
            .get(..label.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(label));
        if matches {
            return text[label.len()..].trim_start();
        }
    }

    text
}

/// Drop fenced code blocks and unwrap inline code spans (any backtick run).
pub fn strip_markdown(text: &str) -> String {
    let without_fences = fenced_block().replace_all(text, "");
    inline_code().replace_all(&without_fences, "$1").into_owned()
}

/// Clean a raw response without judging the result.
///
/// Markdown goes first so the label check sees what will lead the output.
/// Deterministic; may return an empty string.
pub fn clean_text(raw: &str) -> String {
    let (_, answer) = extract_thinking(raw);
    let plain = strip_markdown(&answer);
    strip_label(plain.trim()).trim().to_string()
}

/// Clean a raw response produced for `operation`.
///
/// Fails with [`RewriteError::CleanedResultEmpty`] when nothing is left.
pub fn clean_response(raw: &str, operation: Operation) -> Result<String> {
    let cleaned = clean_text(raw);
    if cleaned.is_empty() {
        tracing::debug!(
            operation = %operation,
            raw_len = raw.len(),
            "response empty after cleaning"
        );
        return Err(RewriteError::CleanedResultEmpty);
    }
    Ok(cleaned)
}
