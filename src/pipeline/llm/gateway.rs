use serde_json::{Map, Value};

use super::json::{extract_json, parse_json_object};
use super::types::{LlmClient, OutputMode};
use super::LlmError;

/// Single entry point for prompting the generative model.
///
/// Owns the client and the model name; the task helpers in
/// [`super::tasks`] are implemented on top of it.
pub struct LlmGateway<C: LlmClient> {
    client: C,
    model: String,
}

impl<C: LlmClient> LlmGateway<C> {
    pub fn new(client: C, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Fail fast with [`LlmError::ModelNotFound`] when the configured model
    /// is not installed.
    pub fn ensure_model_available(&self) -> Result<(), LlmError> {
        if self.client.is_model_available(&self.model)? {
            tracing::info!(model = %self.model, "Model confirmed");
            Ok(())
        } else {
            Err(LlmError::ModelNotFound(self.model.clone()))
        }
    }

    /// One request, raw text back. Transport failures propagate unchanged.
    pub fn complete_text(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        self.client
            .generate(&self.model, prompt, system, OutputMode::Text)
    }

    /// Ask for a JSON object.
    ///
    /// Uses the native JSON mode first. If that reply is not a JSON object,
    /// re-asks without constraints and extracts an object from the prose
    /// (see [`extract_json`]). Fails with [`LlmError::NoStructuredData`] when
    /// nothing JSON-shaped comes back.
    pub fn complete_structured(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<Map<String, Value>, LlmError> {
        match self
            .client
            .generate(&self.model, prompt, system, OutputMode::Json)
        {
            Ok(raw) => {
                if let Some(object) = parse_json_object(&raw) {
                    return Ok(object);
                }
                tracing::warn!(
                    model = %self.model,
                    response_chars = raw.len(),
                    "JSON mode reply was not an object, retrying without format"
                );
            }
            Err(LlmError::ResponseParsing(reason)) => {
                tracing::warn!(model = %self.model, %reason, "Malformed JSON mode reply, retrying without format");
            }
            Err(e) => return Err(e),
        }

        let raw = self.complete_text(prompt, system)?;
        extract_json(&raw)
    }
}
