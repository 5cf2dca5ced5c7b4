//! Ranking protocol: ask the backend to order its own candidates.
//!
//! Candidates are labelled `A`, `B`, `C`, ... by position and wrapped in
//! `<A>...</A>` tags. The backend answers with a best-to-worst letter list
//! such as `[B,A,C]`, which is mapped back to original indices.

use crate::{
    backend::{Backend, InvokeOptions},
    cleaner::extract_thinking,
    error::{Result, RewriteError},
    prompt::{substitute, tagged_candidates, PromptVars},
    types::{Ranking, RankingRequest},
};
use regex::Regex;
use std::sync::OnceLock;

/// Letters run out after `Z`.
pub const MAX_CANDIDATES: usize = 26;

pub const RANKING_TEMPLATE: &str = r#"You are judging several candidate outputs produced for the same task.

Task: {TASK}

Each candidate is enclosed in a tag named after its letter:

{GENERATIONS}

Rank every candidate from best to worst by how well it accomplishes the task: correctness, faithfulness to the original meaning, fluency, and following the instructions.
Answer with only the letters of all candidates in order from best to worst, comma-separated inside square brackets, for example [B,A,C]. Do not explain."#;

static BRACKETED: OnceLock<Regex> = OnceLock::new();
static BARE: OnceLock<Regex> = OnceLock::new();

fn bracketed() -> &'static Regex {
    BRACKETED.get_or_init(|| {
        Regex::new(r"\[\s*[A-Z](?:\s*,\s*[A-Z])*\s*\]").expect("Invalid bracketed ranking pattern")
    })
}

fn bare() -> &'static Regex {
    BARE.get_or_init(|| {
        Regex::new(r"\b[A-Z](?:\s*,\s*[A-Z]\b)+").expect("Invalid bare ranking pattern")
    })
}

/// Rank the candidates of `request` from best to worst.
///
/// A single candidate ranks as itself without a backend call.
pub async fn rank<B>(backend: &B, request: &RankingRequest) -> Result<Ranking>
where
    B: Backend + ?Sized,
{
    let count = request.candidates.len();
    match count {
        0 => return Err(RewriteError::EmptyInput),
        1 => {
            return Ok(Ranking {
                order: vec![0],
                raw_reply: None,
            })
        }
        n if n > MAX_CANDIDATES => {
            return Err(RewriteError::InvalidConfig(format!(
                "cannot rank {} candidates, at most {} are supported",
                n, MAX_CANDIDATES
            )))
        }
        _ => {}
    }

    backend.check_ready()?;
    let prompt = build_ranking_prompt(request)?;
    tracing::debug!(
        backend = backend.name(),
        candidates = count,
        prompt_chars = prompt.len(),
        "ranking prompt built"
    );

    let reply = backend.complete(&prompt, &InvokeOptions::default()).await?;
    if reply.trim().is_empty() {
        return Err(RewriteError::BackendEmptyResponse);
    }

    let order = parse_ranking(&reply, count)?;
    tracing::info!(backend = backend.name(), ?order, "candidates ranked");

    Ok(Ranking {
        order,
        raw_reply: Some(reply),
    })
}

/// Render the ranking prompt for `request`.
pub fn build_ranking_prompt(request: &RankingRequest) -> Result<String> {
    let vars = PromptVars::new()
        .task(request.task.trim())
        .generations(tagged_candidates(&request.candidates));
    substitute(RANKING_TEMPLATE, &vars)
}

/// Parse a letter ranking from `reply` into original indices.
///
/// A bracketed list wins over bare text; without brackets the longest
/// comma-separated run of standalone capital letters is used, and a reply
/// made of a single letter counts as a list of one. Letters beyond
/// `candidate_count` are ignored and repeated letters count once.
/// Every candidate must appear exactly once.
pub fn parse_ranking(reply: &str, candidate_count: usize) -> Result<Vec<usize>> {
    let (_, answer) = extract_thinking(reply);
    let run = find_letter_run(&answer).ok_or_else(|| {
        RewriteError::NoRankingFound(answer.trim().chars().take(200).collect())
    })?;

    let mut order = Vec::with_capacity(candidate_count);
    for letter in run.chars().filter(|c| c.is_ascii_uppercase()) {
        let index = (letter as u8 - b'A') as usize;
        if index < candidate_count && !order.contains(&index) {
            order.push(index);
        }
    }

    if order.len() != candidate_count {
        return Err(RewriteError::IncompleteRanking {
            expected: candidate_count,
            found: order.len(),
        });
    }
    Ok(order)
}

fn find_letter_run(text: &str) -> Option<&str> {
    if let Some(found) = bracketed().find(text) {
        return Some(found.as_str());
    }
    // A reply that is nothing but one letter is a one-item list.
    let trimmed = text.trim();
    if trimmed.len() == 1 && trimmed.chars().all(|c| c.is_ascii_uppercase()) {
        return Some(trimmed);
    }
    bare()
        .find_iter(text)
        .map(|m| m.as_str())
        .fold(None, |best: Option<&str>, run| match best {
            Some(b) if letter_count(b) >= letter_count(run) => Some(b),
            _ => Some(run),
        })
}

fn letter_count(run: &str) -> usize {
    run.chars().filter(|c| c.is_ascii_uppercase()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bracketed() {
        assert_eq!(parse_ranking("[C,A,B]", 3).unwrap(), vec![2, 0, 1]);
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        assert_eq!(parse_ranking("Ranking: [ B , A ]", 2).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_parse_bare_list() {
        assert_eq!(parse_ranking("B, C, A", 3).unwrap(), vec![1, 2, 0]);
    }

    #[test]
    fn test_parse_prefers_brackets() {
        let reply = "I compared A, B first. Final answer: [B,A]";
        assert_eq!(parse_ranking(reply, 2).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_parse_longest_bare_run() {
        let reply = "Between A, B the order is C, A, B overall";
        assert_eq!(parse_ranking(reply, 3).unwrap(), vec![2, 0, 1]);
    }

    #[test]
    fn test_parse_ignores_letters_inside_words() {
        let reply = "Best Answer: B,A";
        assert_eq!(parse_ranking(reply, 2).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_parse_skips_think_block() {
        let reply = "<think>Maybe [A,B]? No.</think>[B,A]";
        assert_eq!(parse_ranking(reply, 2).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_parse_no_ranking() {
        match parse_ranking("no idea", 2) {
            Err(RewriteError::NoRankingFound(reply)) => assert_eq!(reply, "no idea"),
            other => panic!("Expected NoRankingFound, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_lone_capital_is_not_a_ranking() {
        assert!(matches!(
            parse_ranking("I can't decide", 2),
            Err(RewriteError::NoRankingFound(_))
        ));
    }

    #[test]
    fn test_parse_lone_letter_reply() {
        assert_eq!(
            parse_ranking("  B\n", 2).unwrap_err(),
            RewriteError::IncompleteRanking {
                expected: 2,
                found: 1
            }
        );
        assert_eq!(
            parse_ranking("[B]", 2).unwrap_err(),
            RewriteError::IncompleteRanking {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_parse_incomplete() {
        assert_eq!(
            parse_ranking("[A,B]", 3).unwrap_err(),
            RewriteError::IncompleteRanking {
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_parse_ignores_out_of_range() {
        assert_eq!(parse_ranking("[B,D,A]", 2).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_parse_duplicate_counts_once() {
        assert_eq!(
            parse_ranking("[A,A,B]", 3).unwrap_err(),
            RewriteError::IncompleteRanking {
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_ranking_prompt() {
        let request = RankingRequest::new(
            "Fix grammar",
            vec!["one".to_string(), "two".to_string()],
        );
        let prompt = build_ranking_prompt(&request).unwrap();
        assert!(prompt.contains("Task: Fix grammar"));
        assert!(prompt.contains("<A>\none\n</A>\n\n<B>\ntwo\n</B>"));
        assert!(!prompt.contains("{TASK}"));
        assert!(!prompt.contains("{GENERATIONS}"));
    }
}
