//! The closed set of text transformations and their default prompts.

use crate::error::{Result, RewriteError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const REPHRASE_TEMPLATE: &str = r#"Rewrite the following text so it reads clearly and naturally while keeping its meaning, tone, and language.
Respond with only the rewritten text. Do not add explanations, labels, or quotes.

Text:
{TEXT}"#;

const GRAMMAR_TEMPLATE: &str = r#"Correct the spelling, grammar, and punctuation of the following text. Keep the wording as close to the original as possible and do not change its language.
Respond with only the corrected text. Do not add explanations, labels, or quotes.

Text:
{TEXT}"#;

const SIMPLIFY_TEMPLATE: &str = r#"Rewrite the following text using simpler words and shorter sentences so it is easy to understand. Keep all of the important information.
Respond with only the simplified text. Do not add explanations, labels, or quotes.

Text:
{TEXT}"#;

const EXPAND_TEMPLATE: &str = r#"Expand the following text with more detail and supporting context while preserving its original meaning and language.
Respond with only the expanded text. Do not add explanations, labels, or quotes.

Text:
{TEXT}"#;

const FORMAL_TEMPLATE: &str = r#"Rewrite the following text in a formal, professional tone. Keep the meaning and the language unchanged.
Respond with only the rewritten text. Do not add explanations, labels, or quotes.

Text:
{TEXT}"#;

const CASUAL_TEMPLATE: &str = r#"Rewrite the following text in a relaxed, friendly, conversational tone. Keep the meaning and the language unchanged.
Respond with only the rewritten text. Do not add explanations, labels, or quotes.

Text:
{TEXT}"#;

const BULLET_POINTS_TEMPLATE: &str = r#"Convert the following text into a concise list of bullet points, one idea per line, each starting with "- ".
Respond with only the bullet points. Do not add a heading or explanations.

Text:
{TEXT}"#;

const PARAGRAPH_TEMPLATE: &str = r#"Combine the following notes or bullet points into a single well-structured paragraph of flowing prose.
Respond with only the paragraph. Do not add a heading or explanations.

Text:
{TEXT}"#;

const CLEAN_TEMPLATE: &str = r#"Clean up the following text: remove stray symbols, duplicated words, broken line wraps, and formatting debris, without changing the wording otherwise.
Respond with only the cleaned text. Do not add explanations, labels, or quotes.

Text:
{TEXT}"#;

const TRANSLATE_TEMPLATE: &str = r#"Translate the following text into {LANGUAGE}. Preserve the meaning, tone, and formatting.
Respond with only the {LANGUAGE} translation. Do not add explanations, labels, notes, or quotes.

Text:
{TEXT}"#;

const SUMMARIZE_TEMPLATE: &str = r#"Summarize the following text in a few sentences, keeping only the key points. Write the summary in the same language as the text.
Respond with only the summary. Do not add explanations, labels, or quotes.

Text:
{TEXT}"#;

/// A text transformation the pipeline can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Rephrase,
    Grammar,
    Simplify,
    Expand,
    Formal,
    Casual,
    BulletPoints,
    Paragraph,
    Clean,
    Translate,
    Summarize,
}

impl Operation {
    pub const ALL: [Operation; 11] = [
        Operation::Rephrase,
        Operation::Grammar,
        Operation::Simplify,
        Operation::Expand,
        Operation::Formal,
        Operation::Casual,
        Operation::BulletPoints,
        Operation::Paragraph,
        Operation::Clean,
        Operation::Translate,
        Operation::Summarize,
    ];

    /// Stable identifier used on the command line and in serialized requests.
    pub fn id(&self) -> &'static str {
        match self {
            Operation::Rephrase => "rephrase",
            Operation::Grammar => "grammar",
            Operation::Simplify => "simplify",
            Operation::Expand => "expand",
            Operation::Formal => "formal",
            Operation::Casual => "casual",
            Operation::BulletPoints => "bullet_points",
            Operation::Paragraph => "paragraph",
            Operation::Clean => "clean",
            Operation::Translate => "translate",
            Operation::Summarize => "summarize",
        }
    }

    /// The default prompt template for this operation.
    pub fn default_template(&self) -> &'static str {
        match self {
            Operation::Rephrase => REPHRASE_TEMPLATE,
            Operation::Grammar => GRAMMAR_TEMPLATE,
            Operation::Simplify => SIMPLIFY_TEMPLATE,
            Operation::Expand => EXPAND_TEMPLATE,
            Operation::Formal => FORMAL_TEMPLATE,
            Operation::Casual => CASUAL_TEMPLATE,
            Operation::BulletPoints => BULLET_POINTS_TEMPLATE,
            Operation::Paragraph => PARAGRAPH_TEMPLATE,
            Operation::Clean => CLEAN_TEMPLATE,
            Operation::Translate => TRANSLATE_TEMPLATE,
            Operation::Summarize => SUMMARIZE_TEMPLATE,
        }
    }

    /// Whether the operation takes a target language.
    pub fn is_translation(&self) -> bool {
        matches!(self, Operation::Translate)
    }

    /// Short description of the task, used as the ranking `{TASK}`.
    pub fn task_description(&self, language: &str) -> String {
        match self {
            Operation::Rephrase => {
                "Rephrase the text so it reads clearly and naturally".to_string()
            }
            Operation::Grammar => {
                "Fix the spelling, grammar, and punctuation of the text".to_string()
            }
            Operation::Simplify => "Simplify the text so it is easy to understand".to_string(),
            Operation::Expand => "Expand the text with more detail".to_string(),
            Operation::Formal => "Rewrite the text in a formal tone".to_string(),
            Operation::Casual => "Rewrite the text in a casual tone".to_string(),
            Operation::BulletPoints => "Convert the text into bullet points".to_string(),
            Operation::Paragraph => "Combine the text into a single paragraph".to_string(),
            Operation::Clean => "Clean up formatting debris in the text".to_string(),
            Operation::Translate => format!("Translate the text into {}", language),
            Operation::Summarize => "Summarize the key points of the text".to_string(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Operation {
    type Err = RewriteError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.id() == wanted)
            .ok_or_else(|| RewriteError::UnsupportedOperation(s.to_string()))
    }
}

/// Look up the default template for an operation identifier.
pub fn template_for_id(id: &str) -> Result<&'static str> {
    Ok(id.parse::<Operation>()?.default_template())
}
