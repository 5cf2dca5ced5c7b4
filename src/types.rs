use crate::operation::Operation;
use crate::prompt::DEFAULT_LANGUAGE;
use serde::{Deserialize, Serialize};

/// Input for a generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Text to transform. Must be non-empty after trimming.
    pub source_text: String,
    pub operation: Operation,
    /// Template used instead of the operation's default.
    pub custom_prompt: Option<String>,
    /// Target language for translation-like operations.
    pub target_language: Option<String>,
    /// Variation seed. `generate_many` derives one seed per variation from it.
    pub seed: Option<u64>,
}

impl GenerationRequest {
    pub fn new(source_text: impl Into<String>, operation: Operation) -> Self {
        Self {
            source_text: source_text.into(),
            operation,
            custom_prompt: None,
            target_language: None,
            seed: None,
        }
    }

    pub fn with_custom_prompt(mut self, template: impl Into<String>) -> Self {
        self.custom_prompt = Some(template.into());
        self
    }

    pub fn with_target_language(mut self, language: impl Into<String>) -> Self {
        self.target_language = Some(language.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Target language with the default applied.
    pub fn language(&self) -> &str {
        self.target_language.as_deref().unwrap_or(DEFAULT_LANGUAGE)
    }
}

/// A successful generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    /// Cleaned text. Never empty.
    pub text: String,
    /// Full text as the backend produced it.
    pub raw_response: String,
    /// Reasoning extracted from `<think>` blocks, if any.
    pub thinking: Option<String>,
    /// Seed the variation was generated with.
    pub seed: Option<u64>,
}

/// Input for the ranking protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingRequest {
    /// What the candidates were supposed to accomplish.
    pub task: String,
    /// Candidate outputs, in their original order.
    pub candidates: Vec<String>,
}

impl RankingRequest {
    pub fn new(task: impl Into<String>, candidates: Vec<String>) -> Self {
        Self {
            task: task.into(),
            candidates,
        }
    }

    /// Build a request from the successful generations of a batch.
    pub fn from_generations<'a>(
        task: impl Into<String>,
        generations: impl IntoIterator<Item = &'a Generation>,
    ) -> Self {
        Self::new(task, generations.into_iter().map(|g| g.text.clone()).collect())
    }
}

/// Best-to-worst ordering of candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranking {
    /// `order[rank]` is the original index of the candidate at that rank.
    pub order: Vec<usize>,
    /// Backend reply the order was parsed from. `None` when no call was needed.
    pub raw_reply: Option<String>,
}

impl Ranking {
    /// Items reordered best first.
    pub fn reorder<T: Clone>(&self, items: &[T]) -> Vec<T> {
        self.order
            .iter()
            .filter_map(|&i| items.get(i).cloned())
            .collect()
    }

    /// Items paired with their 1-based rank, best first.
    pub fn ranked<'a, T>(&self, items: &'a [T]) -> Vec<(usize, &'a T)> {
        self.order
            .iter()
            .filter_map(|&i| items.get(i))
            .enumerate()
            .map(|(rank, item)| (rank + 1, item))
            .collect()
    }

    /// 1-based rank of the candidate originally at `index`.
    pub fn rank_of(&self, index: usize) -> Option<usize> {
        self.order.iter().position(|&i| i == index).map(|p| p + 1)
    }
}
