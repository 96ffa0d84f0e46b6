pub mod types;
pub mod ollama;
pub mod json;
pub mod gateway;
pub mod prompt;
pub mod tasks;

pub use types::*;
pub use ollama::*;
pub use json::*;
pub use gateway::*;

use thiserror::Error;

/// Maximum characters of model output carried in [`LlmError::NoStructuredData`].
pub const SNIPPET_CHARS: usize = 200;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Ollama is not running at {0}")]
    OllamaConnection(String),

    #[error("Model {0} is not installed in Ollama (try `ollama pull {0}`)")]
    ModelNotFound(String),

    #[error("Ollama returned error (status {status}): {body}")]
    OllamaError { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Could not extract JSON from LLM response: {snippet}")]
    NoStructuredData { snippet: String },
}

impl LlmError {
    /// Build a [`LlmError::NoStructuredData`] from the full model output.
    pub fn no_structured_data(text: &str) -> Self {
        Self::NoStructuredData {
            snippet: text.chars().take(SNIPPET_CHARS).collect(),
        }
    }
}
