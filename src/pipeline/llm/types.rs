use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::LlmError;

/// How the model should shape its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Unconstrained text.
    Text,
    /// Ollama's native JSON mode (`format: "json"`).
    Json,
}

impl OutputMode {
    /// Sampling temperature used for each mode.
    pub fn temperature(self) -> f32 {
        match self {
            OutputMode::Text => 0.3,
            OutputMode::Json => 0.2,
        }
    }
}

/// Ollama LLM client abstraction (allows mocking)
pub trait LlmClient {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
        mode: OutputMode,
    ) -> Result<String, LlmError>;

    fn is_model_available(&self, model: &str) -> Result<bool, LlmError>;

    fn list_models(&self) -> Result<Vec<String>, LlmError>;
}

impl LlmClient for Box<dyn LlmClient> {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
        mode: OutputMode,
    ) -> Result<String, LlmError> {
        (**self).generate(model, prompt, system, mode)
    }

    fn is_model_available(&self, model: &str) -> Result<bool, LlmError> {
        (**self).is_model_available(model)
    }

    fn list_models(&self) -> Result<Vec<String>, LlmError> {
        (**self).list_models()
    }
}

/// A structured report, kept exactly as the model returned it.
pub type Report = Map<String, Value>;

/// One medical entity mentioned in a note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    /// symptom, sign, medication, condition, vital_sign or procedure
    #[serde(rename = "type")]
    pub entity_type: String,
    pub normalized: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityExtraction {
    pub entities: Vec<Entity>,
}

impl EntityExtraction {
    /// Reads `entities[]`, skipping items that are not objects. Missing string
    /// fields become empty.
    pub fn from_json(object: &Map<String, Value>) -> Self {
        let entities = object_items(object, "entities")
            .map(|item| Entity {
                text: string_field(item, "text"),
                entity_type: string_field(item, "type"),
                normalized: string_field(item, "normalized"),
            })
            .collect();
        Self { entities }
    }
}

/// Output of the self-assessment decision step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalDecision {
    /// Defaults to `false` when absent or not a boolean.
    pub needs_retrieval: bool,
    /// Defaults to empty. Non-string items are dropped.
    pub queries: Vec<String>,
}

impl RetrievalDecision {
    pub fn from_json(object: &Map<String, Value>) -> Self {
        let needs_retrieval = object
            .get("needs_retrieval")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let queries = object
            .get("queries")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            needs_retrieval,
            queries,
        }
    }
}

/// Score for one evaluation dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// 1-5 from the model, 0 when no report was produced. Always within 0..=5.
    pub score: u8,
    pub feedback: String,
}

pub const MAX_SCORE: u8 = 5;

/// Dimension name (`completeness`, `accuracy`, ..., `overall`) to score,
/// ordered by dimension name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Evaluation {
    pub scores: BTreeMap<String, ScoreEntry>,
}

impl Evaluation {
    /// Reads every object-valued dimension. Scores given as floats or numeric
    /// strings are rounded; everything is clamped to 0..=5.
    pub fn from_json(object: &Map<String, Value>) -> Self {
        let scores = object
            .iter()
            .filter_map(|(dimension, entry)| {
                let entry = entry.as_object()?;
                let score = entry.get("score").map(coerce_score).unwrap_or(0);
                let feedback = entry
                    .get("feedback")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                Some((dimension.clone(), ScoreEntry { score, feedback }))
            })
            .collect();
        Self { scores }
    }

    /// The fixed evaluation used when there is no report to judge.
    pub fn no_report() -> Self {
        let mut scores = BTreeMap::new();
        scores.insert(
            "overall".to_string(),
            ScoreEntry {
                score: 0,
                feedback: "No report generated.".to_string(),
            },
        );
        Self { scores }
    }

    pub fn get(&self, dimension: &str) -> Option<&ScoreEntry> {
        self.scores.get(dimension)
    }

    pub fn overall(&self) -> Option<&ScoreEntry> {
        self.get("overall")
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Note expansion: the rewritten note plus the abbreviations it resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedNote {
    pub expanded_note: String,
    pub entities: Vec<ExpandedEntity>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedEntity {
    pub text: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    /// The shorthand as written in the note.
    pub original: String,
}

impl ExpandedNote {
    pub fn from_json(object: &Map<String, Value>) -> Self {
        let expanded_note = object
            .get("expanded_note")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let entities = object_items(object, "entities")
            .map(|item| ExpandedEntity {
                text: string_field(item, "text"),
                entity_type: string_field(item, "type"),
                original: string_field(item, "original"),
            })
            .collect();
        Self {
            expanded_note,
            entities,
        }
    }
}

fn coerce_score(value: &Value) -> u8 {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(v) if v.is_finite() => v.round().clamp(0.0, f64::from(MAX_SCORE)) as u8,
        _ => 0,
    }
}

fn object_items<'a>(
    object: &'a Map<String, Value>,
    key: &str,
) -> impl Iterator<Item = &'a Map<String, Value>> {
    object
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn string_field(item: &Map<String, Value>, key: &str) -> String {
    item.get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}
