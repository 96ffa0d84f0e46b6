use serde::Serialize;

use crate::pipeline::llm::{Entity, Evaluation, Report};

/// State threaded through the workflow. Everything except the note is
/// unset until the node that owns it runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentState {
    pub patient_note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_entities: Option<Vec<Entity>>,
    /// Empty string when no patient could be identified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs_retrieval: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval_queries: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidelines: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Report>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
}

/// Names of the writable state fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateField {
    ExtractedEntities,
    PatientId,
    NeedsRetrieval,
    RetrievalQueries,
    Guidelines,
    PatientData,
    Report,
    Evaluation,
}

/// Partial update returned by a node. Only the `Some` fields are merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub extracted_entities: Option<Vec<Entity>>,
    pub patient_id: Option<String>,
    pub needs_retrieval: Option<bool>,
    pub retrieval_queries: Option<Vec<String>>,
    pub guidelines: Option<String>,
    pub patient_data: Option<String>,
    pub report: Option<Report>,
    pub evaluation: Option<Evaluation>,
}

impl StateUpdate {
    /// Fields this update sets.
    pub fn fields(&self) -> Vec<StateField> {
        let mut fields = Vec::new();
        if self.extracted_entities.is_some() {
            fields.push(StateField::ExtractedEntities);
        }
        if self.patient_id.is_some() {
            fields.push(StateField::PatientId);
        }
        if self.needs_retrieval.is_some() {
            fields.push(StateField::NeedsRetrieval);
        }
        if self.retrieval_queries.is_some() {
            fields.push(StateField::RetrievalQueries);
        }
        if self.guidelines.is_some() {
            fields.push(StateField::Guidelines);
        }
        if self.patient_data.is_some() {
            fields.push(StateField::PatientData);
        }
        if self.report.is_some() {
            fields.push(StateField::Report);
        }
        if self.evaluation.is_some() {
            fields.push(StateField::Evaluation);
        }
        fields
    }
}

impl AgentState {
    pub fn new(patient_note: &str) -> Self {
        Self {
            patient_note: patient_note.to_string(),
            ..Self::default()
        }
    }

    /// Merge a node's update. Fields the update leaves unset are untouched.
    pub fn apply(&mut self, update: StateUpdate) {
        let StateUpdate {
            extracted_entities,
            patient_id,
            needs_retrieval,
            retrieval_queries,
            guidelines,
            patient_data,
            report,
            evaluation,
        } = update;

        if extracted_entities.is_some() {
            self.extracted_entities = extracted_entities;
        }
        if patient_id.is_some() {
            self.patient_id = patient_id;
        }
        if needs_retrieval.is_some() {
            self.needs_retrieval = needs_retrieval;
        }
        if retrieval_queries.is_some() {
            self.retrieval_queries = retrieval_queries;
        }
        if guidelines.is_some() {
            self.guidelines = guidelines;
        }
        if patient_data.is_some() {
            self.patient_data = patient_data;
        }
        if report.is_some() {
            self.report = report;
        }
        if evaluation.is_some() {
            self.evaluation = evaluation;
        }
    }

    pub fn entities(&self) -> &[Entity] {
        self.extracted_entities.as_deref().unwrap_or(&[])
    }

    pub fn queries(&self) -> &[String] {
        self.retrieval_queries.as_deref().unwrap_or(&[])
    }

    /// Patient id, or `None` when unset or empty.
    pub fn identified_patient(&self) -> Option<&str> {
        self.patient_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn wants_retrieval(&self) -> bool {
        self.needs_retrieval.unwrap_or(false)
    }
}
