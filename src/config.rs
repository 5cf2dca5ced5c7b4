use serde_json::Value;
use std::time::Duration;

/// Sampling configuration for LLM requests.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f64,

    /// Maximum tokens to generate.
    pub max_tokens: u32,

    /// Temperature added per seed step (`step * (seed % 5)`). 0.0 disables it
    /// and leaves the seed as the only source of variation.
    pub seed_temperature_step: f64,

    /// Custom options merged into the Ollama options object.
    pub options: Option<Value>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2048,
            seed_temperature_step: 0.0,
            options: None,
        }
    }
}

impl LlmConfig {
    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = temp;
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_seed_temperature_step(mut self, step: f64) -> Self {
        self.seed_temperature_step = step;
        self
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    /// Temperature to use for a call with the given seed.
    pub fn temperature_for(&self, seed: Option<u64>) -> f64 {
        match seed {
            Some(seed) if self.seed_temperature_step > 0.0 => {
                let nudge = self.seed_temperature_step * (seed % 5) as f64;
                (self.temperature + nudge).min(2.0)
            }
            _ => self.temperature,
        }
    }
}

/// Connection settings for an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Ollama API endpoint (e.g., "http://localhost:11434")
    pub endpoint: String,
    /// Model name (e.g., "llama3.2", "qwen2.5:7b")
    pub model: String,
    /// Request timeout (default: 120s)
    pub timeout: Duration,
    /// System prompt; when set, requests go to `/api/chat`
    pub system_prompt: Option<String>,
    /// Sampling options
    pub llm: LlmConfig,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            timeout: Duration::from_secs(120),
            system_prompt: None,
            llm: LlmConfig::default(),
        }
    }
}

impl OllamaConfig {
    /// Create a new config with the given model name.
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Defaults overridden by `OLLAMA_HOST` and `OLLAMA_MODEL` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(host) = non_empty_var("OLLAMA_HOST") {
            config.endpoint = normalize_host(&host);
        }
        if let Some(model) = non_empty_var("OLLAMA_MODEL") {
            config.model = model;
        }
        config
    }

    /// Set the Ollama endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a system prompt (switches requests to the chat endpoint).
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the sampling options.
    pub fn llm(mut self, llm: LlmConfig) -> Self {
        self.llm = llm;
        self
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `OLLAMA_HOST` is often a bare `host:port`.
fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}
