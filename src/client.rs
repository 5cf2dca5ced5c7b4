use crate::{
    backend::{Backend, DeltaStream, InvokeOptions},
    config::OllamaConfig,
    error::{Result, RewriteError},
};
use async_trait::async_trait;
use futures::{stream, Stream, StreamExt};
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::time::Instant;

/// [`Backend`] implementation for an Ollama server.
///
/// Uses `/api/generate`, or `/api/chat` when a system prompt is configured.
/// Streaming responses are newline-delimited JSON objects.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    http: Client,
    config: OllamaConfig,
}

impl OllamaBackend {
    /// Create a backend with its own HTTP client using the configured timeout.
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                RewriteError::InvalidConfig(format!("Failed to build HTTP client: {}", e))
            })?;
        Ok(Self::with_http_client(http, config))
    }

    /// Use a custom `reqwest::Client` (for connection pooling, proxies, TLS).
    pub fn with_http_client(http: Client, config: OllamaConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn url(&self) -> String {
        let path = if self.config.system_prompt.is_some() {
            "api/chat"
        } else {
            "api/generate"
        };
        format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    fn request_body(&self, prompt: &str, options: &InvokeOptions, stream: bool) -> Value {
        let llm = &self.config.llm;
        let mut body = match &self.config.system_prompt {
            Some(system) => json!({
                "model": self.config.model,
                "messages": [
                    {"role": "system", "content": system},
                    {"role": "user", "content": prompt},
                ],
                "stream": stream,
            }),
            None => json!({
                "model": self.config.model,
                "prompt": prompt,
                "stream": stream,
            }),
        };

        body["options"] = json!({
            "temperature": llm.temperature_for(options.seed),
            "num_predict": llm.max_tokens,
        });
        if let Some(seed) = options.seed {
            body["options"]["seed"] = json!(seed);
        }

        merge_custom_options(&mut body, llm.options.as_ref());
        body
    }

    async fn send(
        &self,
        prompt: &str,
        options: &InvokeOptions,
        stream: bool,
    ) -> Result<reqwest::Response> {
        let url = self.url();
        let body = self.request_body(prompt, options, stream);

        tracing::debug!(
            model = %self.config.model,
            prompt_chars = prompt.len(),
            seed = ?options.seed,
            stream,
            "Ollama request"
        );

        let start = Instant::now();
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RewriteError::Connection {
                endpoint: self.config.endpoint.clone(),
                message: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RewriteError::BackendTransport { status, body });
        }

        tracing::info!("Ollama responded in {:.1}s", start.elapsed().as_secs_f64());
        Ok(resp)
    }
}

#[async_trait]
impl Backend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn check_ready(&self) -> Result<()> {
        if self.config.model.trim().is_empty() {
            return Err(RewriteError::BackendUnavailable(
                "no Ollama model configured".to_string(),
            ));
        }
        let endpoint = self.config.endpoint.as_str();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(RewriteError::BackendUnavailable(format!(
                "invalid Ollama endpoint '{}'",
                endpoint
            )));
        }
        Ok(())
    }

    async fn complete(&self, prompt: &str, options: &InvokeOptions) -> Result<String> {
        let resp = self.send(prompt, options, false).await?;
        let json: Value = resp
            .json()
            .await
            .map_err(|e| RewriteError::InvalidResponse(e.to_string()))?;

        if let Some(error) = json.get("error").and_then(|v| v.as_str()) {
            return Err(RewriteError::InvalidResponse(error.to_string()));
        }

        response_text(&json)
            .map(str::to_string)
            .ok_or_else(|| RewriteError::InvalidResponse("Response missing text field".to_string()))
    }

    async fn stream(&self, prompt: &str, options: &InvokeOptions) -> Result<DeltaStream> {
        let resp = self.send(prompt, options, true).await?;
        Ok(decode_stream(resp.bytes_stream(), self.config.endpoint.clone()))
    }
}

/// Text field of a generate (`response`) or chat (`message.content`) object.
fn response_text(json: &Value) -> Option<&str> {
    json.get("response")
        .and_then(|v| v.as_str())
        .or_else(|| json.pointer("/message/content").and_then(|v| v.as_str()))
}

/// Merge custom options into the body's options object.
fn merge_custom_options(body: &mut Value, custom: Option<&Value>) {
    if let Some(custom) = custom.and_then(|c| c.as_object()) {
        if let Some(options) = body["options"].as_object_mut() {
            for (k, v) in custom {
                options.insert(k.clone(), v.clone());
            }
        }
    }
}

/// Incremental decoder for Ollama's newline-delimited JSON stream.
///
/// Network chunks do not respect line (or UTF-8) boundaries, so partial
/// lines are buffered as bytes until their newline arrives.
#[derive(Debug, Default)]
pub(crate) struct NdjsonDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl NdjsonDecoder {
    /// Feed a chunk; returns the deltas completed by it.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<Result<String>> {
        let mut out = Vec::new();
        if self.done {
            return out;
        }
        self.buffer.extend_from_slice(chunk);

        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            self.decode_line(&line, &mut out);
            if self.done {
                self.buffer.clear();
                break;
            }
        }
        out
    }

    /// Flush a trailing line that had no newline.
    pub(crate) fn finish(&mut self) -> Vec<Result<String>> {
        let mut out = Vec::new();
        if !self.done && !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.decode_line(&line, &mut out);
        }
        self.done = true;
        out
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done
    }

    fn decode_line(&mut self, line: &[u8], out: &mut Vec<Result<String>>) {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let json: Value = match serde_json::from_str(line) {
            Ok(json) => json,
            Err(e) => {
                self.done = true;
                out.push(Err(RewriteError::InvalidResponse(format!(
                    "Malformed stream line ({}): {}",
                    e,
                    line.chars().take(200).collect::<String>()
                ))));
                return;
            }
        };

        if let Some(error) = json.get("error").and_then(|v| v.as_str()) {
            self.done = true;
            out.push(Err(RewriteError::InvalidResponse(error.to_string())));
            return;
        }

        if let Some(delta) = response_text(&json) {
            if !delta.is_empty() {
                out.push(Ok(delta.to_string()));
            }
        }

        if json.get("done").and_then(|v| v.as_bool()).unwrap_or(false) {
            self.done = true;
        }
    }
}

struct StreamState {
    bytes: stream::BoxStream<'static, std::result::Result<Vec<u8>, String>>,
    decoder: NdjsonDecoder,
    pending: VecDeque<Result<String>>,
    finished: bool,
    endpoint: String,
}

/// Turn a raw byte stream into a [`DeltaStream`].
pub(crate) fn decode_stream<S, B, E>(bytes: S, endpoint: String) -> DeltaStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + 'static,
    E: std::fmt::Display + 'static,
{
    let state = StreamState {
        bytes: bytes
            .map(|chunk| chunk.map(|b| b.as_ref().to_vec()).map_err(|e| e.to_string()))
            .boxed(),
        decoder: NdjsonDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
        endpoint,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.finished {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    st.pending.extend(st.decoder.push(&chunk));
                    st.finished = st.decoder.is_done();
                }
                Some(Err(message)) => {
                    st.finished = true;
                    st.pending.push_back(Err(RewriteError::Connection {
                        endpoint: st.endpoint.clone(),
                        message,
                    }));
                }
                None => {
                    st.finished = true;
                    st.pending.extend(st.decoder.finish());
                }
            }
        }
    })
    .boxed()
}
