//! Generative-text model invoker.
//!
//! `LlmClient` is the seam the orchestrator depends on. `AnthropicClient`
//! talks to the Messages API over blocking HTTP; it performs exactly one
//! request per call and never retries.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const MAX_OUTPUT_TOKENS: u32 = 4000;
pub const TEMPERATURE: f32 = 0.7;
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Error, Debug)]
pub enum ModelInvocationError {
    #[error("Model API key is not configured")]
    MissingApiKey,

    #[error("Model API unreachable at {0}")]
    Connection(String),

    #[error("Model request timed out after {0}s")]
    Timeout(u64),

    #[error("Model API returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed model response: {0}")]
    ResponseParsing(String),

    #[error("Model response contained no text content")]
    NoTextContent,
}

/// Raw text of one model reply plus token accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelOutput {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl ModelOutput {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// Synchronous model client. Implementations must be usable from a
/// blocking worker thread.
pub trait LlmClient: Send + Sync {
    /// Identifier stored on every insight this client produces.
    fn model_name(&self) -> &str;

    fn generate(&self, prompt: &str) -> Result<ModelOutput, ModelInvocationError>;
}

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 120,
        }
    }
}

pub struct AnthropicClient {
    config: AnthropicConfig,
    client: reqwest::blocking::Client,
}

impl AnthropicClient {
    /// Build the client. Must not be called from inside an async runtime
    /// worker: the blocking reqwest client owns its own runtime.
    pub fn new(config: AnthropicConfig) -> Result<Self, ModelInvocationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelInvocationError::HttpClient(e.to_string()))?;

        Ok(Self {
            config: AnthropicConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            client,
        })
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [RequestMessage<'a>; 1],
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

fn messages_request<'a>(model: &'a str, prompt: &'a str) -> MessagesRequest<'a> {
    MessagesRequest {
        model,
        max_tokens: MAX_OUTPUT_TOKENS,
        temperature: TEMPERATURE,
        messages: [RequestMessage {
            role: "user",
            content: prompt,
        }],
    }
}

/// The first text-type block wins; other block types are skipped.
fn output_from_body(body: &str) -> Result<ModelOutput, ModelInvocationError> {
    let parsed: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| ModelInvocationError::ResponseParsing(e.to_string()))?;

    let text = parsed
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .filter(|text| !text.is_empty())
        .ok_or(ModelInvocationError::NoTextContent)?;

    Ok(ModelOutput {
        text,
        input_tokens: parsed.usage.input_tokens,
        output_tokens: parsed.usage.output_tokens,
    })
}

impl LlmClient for AnthropicClient {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn generate(&self, prompt: &str) -> Result<ModelOutput, ModelInvocationError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ModelInvocationError::MissingApiKey)?;
        let url = format!("{}/v1/messages", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&messages_request(&self.config.model, prompt))
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    ModelInvocationError::Connection(self.config.base_url.clone())
                } else if e.is_timeout() {
                    ModelInvocationError::Timeout(self.config.timeout_secs)
                } else {
                    ModelInvocationError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| ModelInvocationError::HttpClient(e.to_string()))?;
        if !status.is_success() {
            return Err(ModelInvocationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        output_from_body(&body)
    }
}

/// Scripted client for tests and offline runs.
///
/// Replies are taken from the script in order; once it is exhausted every
/// call gets the fallback reply. Prompts are recorded.
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<String, String>>>,
    fallback: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Ok(response.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            fallback: Err(message.to_string()),
            ..Self::new("")
        }
    }

    pub fn with_script(mut self, script: Vec<Result<String, String>>) -> Self {
        self.script = Mutex::new(script.into());
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or_default()
    }
}

impl LlmClient for MockLlmClient {
    fn model_name(&self) -> &str {
        "mock-model"
    }

    fn generate(&self, prompt: &str) -> Result<ModelOutput, ModelInvocationError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or_else(|| self.fallback.clone());

        match next {
            Ok(text) => Ok(ModelOutput {
                input_tokens: (prompt.len() / 4) as u32,
                output_tokens: (text.len() / 4) as u32,
                text,
            }),
            Err(message) => Err(ModelInvocationError::Api {
                status: 500,
                body: message,
            }),
        }
    }
}
