//! Best-effort recovery of a JSON object from free-form model output.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::LlmError;

static FENCED_OBJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("valid regex")
});

static OBJECT_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

/// Parse `text` as a JSON object. Arrays and scalars are rejected.
pub fn parse_json_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// Pull a JSON object out of model prose.
///
/// Tries a fenced code block first (```` ```json {...} ``` ````), then the
/// span from the first `{` to the last `}`. A fenced block that does not parse
/// falls through to the span attempt.
pub fn extract_json(text: &str) -> Result<Map<String, Value>, LlmError> {
    if let Some(object) = FENCED_OBJECT_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_json_object(m.as_str()))
    {
        return Ok(object);
    }

    if let Some(object) = OBJECT_SPAN_RE
        .find(text)
        .and_then(|m| parse_json_object(m.as_str()))
    {
        return Ok(object);
    }

    Err(LlmError::no_structured_data(text))
}
