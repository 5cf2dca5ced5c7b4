//! Generation orchestrator.
//!
//! Builds the prompt for a [`GenerationRequest`], calls the backend once per
//! result, and turns the raw answer into a cleaned [`Generation`]. Batches
//! run strictly one after another: a variation's stream is fully drained
//! before the next variation's request is sent.

use crate::{
    backend::{Backend, InvokeOptions},
    cleaner::{clean_response, extract_thinking},
    error::{Result, RewriteError},
    operation::Operation,
    prompt::build_prompt,
    types::{Generation, GenerationRequest},
};
use futures::StreamExt;
use std::time::Instant;

/// Generate a single result with an atomic backend call.
pub async fn generate<B>(backend: &B, request: &GenerationRequest) -> Result<Generation>
where
    B: Backend + ?Sized,
{
    let prompt = prepare(backend, request)?;
    let options = InvokeOptions::with_seed(request.seed);
    let raw = backend.complete(&prompt, &options).await?;
    finish(raw, request.operation, request.seed)
}

/// Generate a single result, streaming it from the backend.
///
/// `on_partial` is called after every delta with the full text accumulated
/// so far, not just the delta. The returned text is cleaned once the stream
/// has finished.
pub async fn generate_streaming<B, F>(
    backend: &B,
    request: &GenerationRequest,
    mut on_partial: F,
) -> Result<Generation>
where
    B: Backend + ?Sized,
    F: FnMut(&str),
{
    let prompt = prepare(backend, request)?;
    let options = InvokeOptions::with_seed(request.seed);
    let raw = accumulate(backend, &prompt, &options, &mut on_partial).await?;
    finish(raw, request.operation, request.seed)
}

/// Generate `count` variations with atomic calls.
///
/// Always returns exactly `count` results; a failed variation is recorded
/// in its slot and the batch moves on.
pub async fn generate_many<B>(
    backend: &B,
    request: &GenerationRequest,
    count: usize,
) -> Vec<Result<Generation>>
where
    B: Backend + ?Sized,
{
    let prompt = match prepare(backend, request) {
        Ok(prompt) => prompt,
        Err(e) => return repeat_failure(e, count),
    };

    let mut results = Vec::with_capacity(count);
    for index in 0..count {
        let seed = variation_seed(request.seed, index);
        let options = InvokeOptions::with_seed(Some(seed));
        let start = Instant::now();
        let result = match backend.complete(&prompt, &options).await {
            Ok(raw) => finish(raw, request.operation, Some(seed)),
            Err(e) => Err(e),
        };
        log_variation(backend, request.operation, index, seed, start, &result);
        results.push(result);
    }
    results
}

/// Generate `count` variations, streaming each one.
///
/// `on_partial` receives the variation index and that variation's
/// accumulated text.
pub async fn generate_many_streaming<B, F>(
    backend: &B,
    request: &GenerationRequest,
    count: usize,
    mut on_partial: F,
) -> Vec<Result<Generation>>
where
    B: Backend + ?Sized,
    F: FnMut(usize, &str),
{
    let prompt = match prepare(backend, request) {
        Ok(prompt) => prompt,
        Err(e) => return repeat_failure(e, count),
    };

    let mut results = Vec::with_capacity(count);
    for index in 0..count {
        let seed = variation_seed(request.seed, index);
        let options = InvokeOptions::with_seed(Some(seed));
        let start = Instant::now();
        let mut forward = |text: &str| on_partial(index, text);
        let result = match accumulate(backend, &prompt, &options, &mut forward).await {
            Ok(raw) => finish(raw, request.operation, Some(seed)),
            Err(e) => Err(e),
        };
        log_variation(backend, request.operation, index, seed, start, &result);
        results.push(result);
    }
    results
}

/// Seed for the variation at `index`: the request seed (or 0) plus the index.
pub fn variation_seed(base: Option<u64>, index: usize) -> u64 {
    base.unwrap_or(0).wrapping_add(index as u64)
}

/// Validate the request and the backend, then build the prompt.
fn prepare<B>(backend: &B, request: &GenerationRequest) -> Result<String>
where
    B: Backend + ?Sized,
{
    let text = request.source_text.trim();
    if text.is_empty() {
        return Err(RewriteError::EmptyInput);
    }
    backend.check_ready()?;

    let language = request
        .operation
        .is_translation()
        .then(|| request.language());
    let prompt = build_prompt(
        request.operation,
        request.custom_prompt.as_deref(),
        text,
        language,
    )?;

    tracing::debug!(
        backend = backend.name(),
        operation = %request.operation,
        custom_prompt = request.custom_prompt.is_some(),
        prompt_chars = prompt.len(),
        "prompt resolved"
    );
    Ok(prompt)
}

/// Drain a backend stream into one buffer, reporting the buffer after each delta.
async fn accumulate<B, F>(
    backend: &B,
    prompt: &str,
    options: &InvokeOptions,
    on_partial: &mut F,
) -> Result<String>
where
    B: Backend + ?Sized,
    F: FnMut(&str),
{
    let mut deltas = backend.stream(prompt, options).await?;
    let mut buffer = String::new();
    let mut received = 0usize;

    while let Some(delta) = deltas.next().await {
        let delta = delta?;
        if delta.is_empty() {
            continue;
        }
        buffer.push_str(&delta);
        received += 1;
        on_partial(&buffer);
    }

    tracing::debug!(deltas = received, chars = buffer.len(), "stream drained");
    Ok(buffer)
}

/// Turn raw backend text into a [`Generation`].
fn finish(raw: String, operation: Operation, seed: Option<u64>) -> Result<Generation> {
    if raw.trim().is_empty() {
        return Err(RewriteError::BackendEmptyResponse);
    }
    let (thinking, _) = extract_thinking(&raw);
    let text = clean_response(&raw, operation)?;
    Ok(Generation {
        text,
        raw_response: raw,
        thinking,
        seed,
    })
}

fn repeat_failure(error: RewriteError, count: usize) -> Vec<Result<Generation>> {
    tracing::warn!(%error, count, "batch rejected before any backend call");
    (0..count).map(|_| Err(error.clone())).collect()
}

fn log_variation<B>(
    backend: &B,
    operation: Operation,
    index: usize,
    seed: u64,
    start: Instant,
    result: &Result<Generation>,
) where
    B: Backend + ?Sized,
{
    let elapsed = start.elapsed().as_secs_f64();
    match result {
        Ok(generation) => tracing::info!(
            backend = backend.name(),
            operation = %operation,
            variation = index,
            seed,
            chars = generation.text.len(),
            "variation {} generated in {:.1}s",
            index + 1,
            elapsed
        ),
        Err(error) => tracing::warn!(
            backend = backend.name(),
            operation = %operation,
            variation = index,
            seed,
            %error,
            "variation {} failed after {:.1}s",
            index + 1,
            elapsed
        ),
    }
}
