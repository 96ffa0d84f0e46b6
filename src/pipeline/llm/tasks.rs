//! Clinical tasks: each fills a prompt template, asks for structured output
//! and converts the reply into a typed result.

use super::gateway::LlmGateway;
use super::prompt::{
    build_entity_extraction_prompt, build_evaluation_prompt, build_expand_note_prompt,
    build_report_prompt, build_retrieval_decision_prompt, SYSTEM_MEDICAL,
};
use super::types::{
    Entity, EntityExtraction, Evaluation, ExpandedNote, LlmClient, Report, RetrievalDecision,
};
use super::LlmError;

/// Used for missing patient data or guideline context in the report prompt.
pub const NOT_AVAILABLE: &str = "Not available";

impl<C: LlmClient> LlmGateway<C> {
    pub fn expand_note(&self, note: &str) -> Result<ExpandedNote, LlmError> {
        let object = self.complete_structured(&build_expand_note_prompt(note), SYSTEM_MEDICAL)?;
        Ok(ExpandedNote::from_json(&object))
    }

    pub fn extract_entities(&self, note: &str) -> Result<EntityExtraction, LlmError> {
        let object =
            self.complete_structured(&build_entity_extraction_prompt(note), SYSTEM_MEDICAL)?;
        let extraction = EntityExtraction::from_json(&object);
        tracing::debug!(entities = extraction.entities.len(), "Entities extracted");
        Ok(extraction)
    }

    pub fn decide_retrieval(
        &self,
        note: &str,
        entities: &[Entity],
    ) -> Result<RetrievalDecision, LlmError> {
        let prompt = build_retrieval_decision_prompt(note, entities);
        let object = self.complete_structured(&prompt, SYSTEM_MEDICAL)?;
        Ok(RetrievalDecision::from_json(&object))
    }

    /// Pass [`NOT_AVAILABLE`] for context that could not be gathered.
    pub fn generate_report(
        &self,
        note: &str,
        patient_data: &str,
        guidelines: &str,
    ) -> Result<Report, LlmError> {
        let prompt = build_report_prompt(note, patient_data, guidelines);
        self.complete_structured(&prompt, SYSTEM_MEDICAL)
    }

    pub fn evaluate_report(&self, report: &Report) -> Result<Evaluation, LlmError> {
        let object = self.complete_structured(&build_evaluation_prompt(report), SYSTEM_MEDICAL)?;
        Ok(Evaluation::from_json(&object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::{MockLlmClient, OutputMode};

    fn gateway(reply: &str) -> LlmGateway<MockLlmClient> {
        LlmGateway::new(MockLlmClient::new(reply), "mistral")
    }

    #[test]
    fn extract_entities_is_typed() {
        let gw = gateway(
            r#"{"entities": [{"text": "DOE", "type": "symptom", "normalized": "dyspnea on exertion"}]}"#,
        );
        let extraction = gw.extract_entities("pt with DOE").unwrap();
        assert_eq!(extraction.entities.len(), 1);
        assert_eq!(extraction.entities[0].normalized, "dyspnea on exertion");

        let calls = gw.client().calls();
        let call = &calls[0];
        assert_eq!(call.system, SYSTEM_MEDICAL);
        assert_eq!(call.mode, OutputMode::Json);
        assert!(call.prompt.contains("pt with DOE"));
    }

    #[test]
    fn decide_retrieval_defaults_on_partial_reply() {
        let gw = gateway(r#"{"queries": ["heart failure diuretics"]}"#);
        let decision = gw.decide_retrieval("note", &[]).unwrap();
        assert!(!decision.needs_retrieval);
        assert_eq!(decision.queries, vec!["heart failure diuretics"]);
    }

    #[test]
    fn generate_report_keeps_object_verbatim() {
        let gw = gateway(r#"{"assessment": "HF", "plan": ["furosemide"], "extra": {"k": 1}}"#);
        let report = gw
            .generate_report("note", NOT_AVAILABLE, NOT_AVAILABLE)
            .unwrap();
        assert_eq!(report.len(), 3);
        assert_eq!(report["extra"]["k"], 1);
        assert!(gw.client().calls()[0].prompt.contains("Not available"));
    }

    #[test]
    fn evaluate_report_is_typed() {
        let gw = gateway(r#"{"overall": {"score": 4, "feedback": "Solid"}}"#);
        let mut report = Report::new();
        report.insert("assessment".into(), "HF".into());
        let evaluation = gw.evaluate_report(&report).unwrap();
        assert_eq!(evaluation.overall().unwrap().score, 4);
    }

    #[test]
    fn expand_note_is_typed() {
        let gw = gateway(
            r#"{"expanded_note": "Shortness of breath", "entities": [{"text": "shortness of breath", "type": "symptom", "original": "SOB"}]}"#,
        );
        let expanded = gw.expand_note("SOB").unwrap();
        assert_eq!(expanded.expanded_note, "Shortness of breath");
        assert_eq!(expanded.entities[0].original, "SOB");
    }

    #[test]
    fn task_propagates_no_structured_data() {
        let gw = gateway("no json");
        assert!(matches!(
            gw.extract_entities("x"),
            Err(LlmError::NoStructuredData { .. })
        ));
    }
}
