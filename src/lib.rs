//! # LLM Rewrite
//!
//! Text transformations (rephrase, grammar fixes, translation, ...) driven by
//! a large language model, with multiple variations and self-ranking.
//!
//! ## Features
//!
//! - **Operation templates**: every [`Operation`] has a default prompt;
//!   custom templates go through the same `{TEXT}` / `{LANGUAGE}`
//!   substitution
//! - **Streaming**: partial-result callbacks receive the full text
//!   accumulated so far
//! - **Variations**: `generate_many` runs sequential calls with distinct
//!   seeds and never aborts the batch on a single failure
//! - **Response cleaning**: strips `<think>` blocks, labels such as
//!   `Corrected:` or `French translation:`, and markdown code
//! - **Ranking**: asks the model to order its own candidates and parses the
//!   `[B,A,C]` style reply back into indices
//! - **Pluggable backends**: anything implementing [`Backend`];
//!   [`OllamaBackend`] is included
//!
//! ## Quick Start
//!
//! ```no_run
//! use llm_rewrite::{
//!     generate_many, rank, GenerationRequest, OllamaBackend, OllamaConfig, Operation,
//!     RankingRequest,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = OllamaBackend::new(OllamaConfig::with_model("llama3.2"))?;
//!     let request = GenerationRequest::new("Me and him goes to the store.", Operation::Grammar);
//!
//!     let results = generate_many(&backend, &request, 3).await;
//!     let candidates: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
//!
//!     let task = request.operation.task_description(request.language());
//!     let ranking_request = RankingRequest::from_generations(task, candidates.iter().copied());
//!     let ranking = rank(&backend, &ranking_request).await?;
//!     for (position, generation) in ranking.ranked(&candidates) {
//!         println!("#{}: {}", position, generation.text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cleaner;
pub mod client;
pub mod config;
pub mod error;
pub mod generate;
pub mod operation;
pub mod prompt;
pub mod rank;
pub mod types;

pub use backend::{Backend, DeltaStream, InvokeOptions};
pub use cleaner::{clean_response, clean_text};
pub use client::OllamaBackend;
pub use config::{LlmConfig, OllamaConfig};
pub use error::{Result, RewriteError};
pub use generate::{generate, generate_many, generate_many_streaming, generate_streaming};
pub use operation::Operation;
pub use prompt::{build_prompt, resolve_template, substitute, PromptVars};
pub use rank::{build_ranking_prompt, parse_ranking, rank};
pub use types::{Generation, GenerationRequest, Ranking, RankingRequest};
