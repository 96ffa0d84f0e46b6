use super::graph::ClinicalAgent;
use super::state::{AgentState, StateUpdate};
use super::AgentError;
use crate::fhir::PatientSummary;
use crate::pipeline::llm::{tasks::NOT_AVAILABLE, Entity, Evaluation, LlmClient};
use crate::pipeline::rag::{format_context, GuidelineRetriever};
use crate::tools::{conditions_text, medications_text, patient_summary, vital_signs_text};

pub const NO_GUIDELINE_QUERY: &str = "No guideline query requested.";
pub const PATIENT_NOT_IDENTIFIED: &str = "Patient not identified.";

/// Name tokens this short are ignored when matching patients.
const MIN_NAME_TOKEN_CHARS: usize = 3;

/// Pick the patient whose name appears in the extracted entities.
///
/// All entity `text` and `normalized` values are lowercased into one blob; the
/// first patient (in load order) with any name token of three or more
/// characters found as a substring wins. With no match the first patient is
/// returned, and with no patients the empty string.
pub fn match_patient_id(entities: &[Entity], patients: &[PatientSummary]) -> String {
    let Some(first) = patients.first() else {
        return String::new();
    };

    let blob = entities
        .iter()
        .map(|e| format!("{} {}", e.text, e.normalized))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    patients
        .iter()
        .find(|p| {
            p.name
                .to_lowercase()
                .split_whitespace()
                .filter(|token| token.chars().count() >= MIN_NAME_TOKEN_CHARS)
                .any(|token| blob.contains(token))
        })
        .unwrap_or(first)
        .id
        .clone()
}

fn or_not_available(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or(NOT_AVAILABLE)
}

impl<C: LlmClient> ClinicalAgent<'_, C> {
    /// Extract entities from the note and identify the patient.
    pub fn parse_note(&self, state: &AgentState) -> Result<StateUpdate, AgentError> {
        let extraction = self.gateway().extract_entities(&state.patient_note)?;
        let patient_id = match_patient_id(&extraction.entities, &self.store().list_patients());
        tracing::info!(
            entities = extraction.entities.len(),
            patient_id = %patient_id,
            "Note parsed"
        );

        Ok(StateUpdate {
            extracted_entities: Some(extraction.entities),
            patient_id: Some(patient_id),
            ..StateUpdate::default()
        })
    }

    /// Ask the model whether guideline context would help, and for which queries.
    pub fn decide_retrieval(&self, state: &AgentState) -> Result<StateUpdate, AgentError> {
        let decision = self
            .gateway()
            .decide_retrieval(&state.patient_note, state.entities())?;
        tracing::info!(
            needs_retrieval = decision.needs_retrieval,
            queries = decision.queries.len(),
            "Retrieval decided"
        );

        Ok(StateUpdate {
            needs_retrieval: Some(decision.needs_retrieval),
            retrieval_queries: Some(decision.queries),
            ..StateUpdate::default()
        })
    }

    pub fn retrieve_guidelines(&self, state: &AgentState) -> Result<StateUpdate, AgentError> {
        let queries = state.queries();
        let guidelines = if queries.is_empty() {
            NO_GUIDELINE_QUERY.to_string()
        } else {
            let retriever = GuidelineRetriever::new(self.embedder(), self.index())
                .with_score_threshold(self.score_threshold());
            format_context(&retriever.retrieve_many(queries)?)
        };

        Ok(StateUpdate {
            guidelines: Some(guidelines),
            ..StateUpdate::default()
        })
    }

    /// Demographics, conditions, medications and vitals, separated by blank lines.
    pub fn fetch_patient_data(&self, state: &AgentState) -> Result<StateUpdate, AgentError> {
        let patient_data = match state.identified_patient() {
            None => PATIENT_NOT_IDENTIFIED.to_string(),
            Some(patient_id) => {
                let store = self.store();
                [
                    patient_summary(store, patient_id),
                    conditions_text(store, patient_id),
                    medications_text(store, patient_id),
                    vital_signs_text(store, patient_id),
                ]
                .join("\n\n")
            }
        };
        tracing::debug!(chars = patient_data.len(), "Patient data fetched");

        Ok(StateUpdate {
            patient_data: Some(patient_data),
            ..StateUpdate::default()
        })
    }

    pub fn generate_report(&self, state: &AgentState) -> Result<StateUpdate, AgentError> {
        let report = self.gateway().generate_report(
            &state.patient_note,
            or_not_available(state.patient_data.as_deref()),
            or_not_available(state.guidelines.as_deref()),
        )?;
        tracing::info!(keys = report.len(), "Report generated");

        Ok(StateUpdate {
            report: Some(report),
            ..StateUpdate::default()
        })
    }

    /// Score the report. An absent or empty report gets the zero-score evaluation
    /// without calling the model.
    pub fn evaluate_report(&self, state: &AgentState) -> Result<StateUpdate, AgentError> {
        let evaluation = match state.report.as_ref().filter(|r| !r.is_empty()) {
            None => {
                tracing::warn!("No report to evaluate");
                Evaluation::no_report()
            }
            Some(report) => self.gateway().evaluate_report(report)?,
        };
        tracing::info!(
            overall = evaluation.overall().map(|s| s.score),
            "Report evaluated"
        );

        Ok(StateUpdate {
            evaluation: Some(evaluation),
            ..StateUpdate::default()
        })
    }
}
