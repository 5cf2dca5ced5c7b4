use crate::{
    error::{Result, RewriteError},
    operation::Operation,
};

/// Language used when a template asks for `{LANGUAGE}` and none was given.
pub const DEFAULT_LANGUAGE: &str = "English";

/// A placeholder token recognized in prompt templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Text,
    Language,
    Task,
    Generations,
}

impl Placeholder {
    pub const ALL: [Placeholder; 4] = [
        Placeholder::Text,
        Placeholder::Language,
        Placeholder::Task,
        Placeholder::Generations,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Placeholder::Text => "{TEXT}",
            Placeholder::Language => "{LANGUAGE}",
            Placeholder::Task => "{TASK}",
            Placeholder::Generations => "{GENERATIONS}",
        }
    }

    pub fn name(&self) -> &'static str {
        let token = self.token();
        &token[1..token.len() - 1]
    }
}

/// Values substituted into a template.
#[derive(Debug, Clone, Default)]
pub struct PromptVars {
    pub text: Option<String>,
    pub language: Option<String>,
    pub task: Option<String>,
    pub generations: Option<String>,
}

impl PromptVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    pub fn generations(mut self, generations: impl Into<String>) -> Self {
        self.generations = Some(generations.into());
        self
    }

    fn value(&self, placeholder: Placeholder) -> Result<&str> {
        let value = match placeholder {
            Placeholder::Text => self.text.as_deref(),
            Placeholder::Language => Some(self.language.as_deref().unwrap_or(DEFAULT_LANGUAGE)),
            Placeholder::Task => self.task.as_deref(),
            Placeholder::Generations => self.generations.as_deref(),
        };
        value.ok_or_else(|| RewriteError::PromptSubstitution {
            placeholder: placeholder.name().to_string(),
        })
    }
}

/// Replace every recognized placeholder in `template` with its value.
///
/// The template is scanned once, left to right, so substituted values are
/// never rescanned: a `{TEXT}` that itself contains `{LANGUAGE}` comes out
/// verbatim. Tokens are matched case-sensitively; anything else in braces
/// is left untouched. `{LANGUAGE}` falls back to [`DEFAULT_LANGUAGE`]; any
/// other placeholder without a value is a [`RewriteError::PromptSubstitution`].
pub fn substitute(template: &str, vars: &PromptVars) -> Result<String> {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('{') {
        rendered.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match Placeholder::ALL.iter().find(|p| tail.starts_with(p.token())) {
            Some(placeholder) => {
                rendered.push_str(vars.value(*placeholder)?);
                rest = &tail[placeholder.token().len()..];
            }
            None => {
                rendered.push('{');
                rest = &tail[1..];
            }
        }
    }
    rendered.push_str(rest);

    Ok(rendered)
}

/// Pick the template for an operation; a custom template always wins.
pub fn resolve_template<'a>(operation: Operation, custom: Option<&'a str>) -> &'a str {
    custom.unwrap_or_else(|| operation.default_template())
}

/// Build the full generation prompt for `text`.
///
/// `language` is only bound for translation-like operations; a custom
/// template that still mentions `{LANGUAGE}` gets the default.
pub fn build_prompt(
    operation: Operation,
    custom: Option<&str>,
    text: &str,
    language: Option<&str>,
) -> Result<String> {
    let template = resolve_template(operation, custom);
    let mut vars = PromptVars::new().text(text);
    if operation.is_translation() {
        if let Some(language) = language {
            vars = vars.language(language);
        }
    }
    substitute(template, &vars)
}

/// Letter assigned to the candidate at `index` (0 => 'A').
pub fn letter_for(index: usize) -> Option<char> {
    u8::try_from(index)
        .ok()
        .filter(|i| *i < 26)
        .map(|i| (b'A' + i) as char)
}

/// Wrap each candidate in a same-letter tag pair, separated by blank lines.
pub fn tagged_candidates(candidates: &[String]) -> String {
    candidates
        .iter()
        .enumerate()
        .filter_map(|(i, text)| {
            letter_for(i).map(|letter| format!("<{letter}>\n{}\n</{letter}>", text.trim()))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
