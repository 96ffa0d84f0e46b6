use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::LlmError;
use super::types::{LlmClient, OutputMode};
use crate::config::Settings;

/// Ollama HTTP client for local LLM inference.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Create a new OllamaClient pointing at an Ollama instance.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, LlmError> {
        Self::new(&settings.ollama_base_url, settings.ollama_timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_connect() {
            LlmError::OllamaConnection(self.base_url.clone())
        } else if e.is_timeout() {
            LlmError::HttpClient(format!("Request timed out after {}s", self.timeout_secs))
        } else {
            LlmError::HttpClient(e.to_string())
        }
    }
}

/// Request body for Ollama /api/chat
#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: [OllamaChatMessage<'a>; 2],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    options: OllamaChatOptions,
}

#[derive(Serialize)]
struct OllamaChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaChatOptions {
    temperature: f32,
}

/// Response body from Ollama /api/chat
#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

/// Response body from Ollama /api/tags
#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

fn chat_request<'a>(
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    mode: OutputMode,
) -> OllamaChatRequest<'a> {
    OllamaChatRequest {
        model,
        messages: [
            OllamaChatMessage {
                role: "system",
                content: system,
            },
            OllamaChatMessage {
                role: "user",
                content: prompt,
            },
        ],
        stream: false,
        format: match mode {
            OutputMode::Json => Some("json"),
            OutputMode::Text => None,
        },
        options: OllamaChatOptions {
            temperature: mode.temperature(),
        },
    }
}

impl LlmClient for OllamaClient {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
        mode: OutputMode,
    ) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = chat_request(model, prompt, system, mode);

        tracing::debug!(model, ?mode, prompt_chars = prompt.len(), "Ollama chat request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaChatResponse = response
            .json()
            .map_err(|e| LlmError::ResponseParsing(e.to_string()))?;

        Ok(parsed.message.content)
    }

    fn is_model_available(&self, model: &str) -> Result<bool, LlmError> {
        let models = self.list_models()?;
        Ok(models.iter().any(|m| m.starts_with(model)))
    }

    fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaTagsResponse = response
            .json()
            .map_err(|e| LlmError::ResponseParsing(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }
}

/// A call seen by [`MockLlmClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub prompt: String,
    pub system: String,
    pub mode: OutputMode,
}

/// Mock LLM client for testing. Replies with scripted responses in order,
/// then with the default response once the script runs out.
pub struct MockLlmClient {
    response: String,
    script: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<RecordedCall>>,
    available_models: Vec<String>,
    unreachable: bool,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            available_models: vec!["mistral:latest".to_string()],
            unreachable: false,
        }
    }

    /// Replies with each of `responses` once, in order.
    pub fn scripted<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new("");
        if let Ok(mut script) = client.script.lock() {
            script.extend(responses.into_iter().map(Into::into));
        }
        client
    }

    /// Every call fails as if Ollama were not running.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::new("")
        }
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.available_models = models;
        self
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl LlmClient for MockLlmClient {
    fn generate(
        &self,
        _model: &str,
        prompt: &str,
        system: &str,
        mode: OutputMode,
    ) -> Result<String, LlmError> {
        if self.unreachable {
            return Err(LlmError::OllamaConnection("mock".into()));
        }

        self.calls
            .lock()
            .map_err(|_| LlmError::HttpClient("Mock call log poisoned".into()))?
            .push(RecordedCall {
                prompt: prompt.to_string(),
                system: system.to_string(),
                mode,
            });

        let next = self
            .script
            .lock()
            .map_err(|_| LlmError::HttpClient("Mock script poisoned".into()))?
            .pop_front();
        Ok(next.unwrap_or_else(|| self.response.clone()))
    }

    fn is_model_available(&self, model: &str) -> Result<bool, LlmError> {
        Ok(self.list_models()?.iter().any(|m| m.starts_with(model)))
    }

    fn list_models(&self) -> Result<Vec<String>, LlmError> {
        if self.unreachable {
            return Err(LlmError::OllamaConnection("mock".into()));
        }
        Ok(self.available_models.clone())
    }
}
