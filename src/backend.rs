//! The text-generation backend seam.
//!
//! The pipeline never talks HTTP itself; it drives anything implementing
//! [`Backend`]. [`crate::client::OllamaBackend`] is the bundled
//! implementation, tests use scripted in-process backends.

use crate::error::{Result, RewriteError};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

/// Incremental text deltas. The stream ending is the end-of-answer signal.
pub type DeltaStream = BoxStream<'static, Result<String>>;

/// Per-call options passed to the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvokeOptions {
    /// Variation seed. How it influences sampling is up to the backend,
    /// but equal seeds must give equal sampling settings.
    pub seed: Option<u64>,
}

impl InvokeOptions {
    pub fn with_seed(seed: Option<u64>) -> Self {
        Self { seed }
    }
}

/// A text-completion backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Validate the handle before any call is made.
    ///
    /// Return [`crate::RewriteError::BackendUnavailable`] when the backend
    /// cannot possibly serve a request (missing model, bad endpoint, ...).
    fn check_ready(&self) -> Result<()> {
        Ok(())
    }

    /// Produce the full answer for `prompt` in one piece.
    async fn complete(&self, prompt: &str, options: &InvokeOptions) -> Result<String>;

    /// Produce the answer for `prompt` as a stream of deltas.
    ///
    /// Backends without native streaming get a single-delta stream built
    /// from [`Backend::complete`].
    async fn stream(&self, prompt: &str, options: &InvokeOptions) -> Result<DeltaStream> {
        let text = self.complete(prompt, options).await?;
        Ok(stream::once(async move { Ok::<_, RewriteError>(text) }).boxed())
    }
}
