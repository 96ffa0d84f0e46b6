use crate::pipeline::llm::types::{Entity, Report};

pub const SYSTEM_MEDICAL: &str = "You are a clinical assistant AI. You help physicians by expanding \
medical abbreviations, extracting structured data from clinical notes, and generating medical \
reports. Always respond in the same language as the input note. Be precise and use standard \
medical terminology.";

const JSON_ONLY: &str = "Respond ONLY with valid JSON, no extra text.";

/// Shorthand note -> expanded note plus the abbreviations it resolved.
pub fn build_expand_note_prompt(note: &str) -> String {
    format!(
        r#"Expand the following doctor's shorthand note into a clear, complete clinical note. Expand all abbreviations, normalize vital signs, and list findings explicitly.

Doctor's note:
{note}

Return a JSON object with these fields:
- "expanded_note": the full expanded clinical note
- "entities": a list of extracted medical entities, each with "text", "type" (one of: symptom, sign, medication, condition, vital_sign, procedure), and "original" (the abbreviation or shorthand used)

{JSON_ONLY}
"#
    )
}

pub fn build_entity_extraction_prompt(note: &str) -> String {
    format!(
        r#"Extract all medical entities from this clinical note.

Note:
{note}

Return a JSON object with a single field "entities", a list of objects, each with:
- "text": the entity as stated in the note
- "type": one of symptom, sign, medication, condition, vital_sign, procedure
- "normalized": the standard medical term (expanded, in the note's language)

{JSON_ONLY}
"#
    )
}

/// Self-assessment step: would guideline context improve the report?
pub fn build_retrieval_decision_prompt(note: &str, entities: &[Entity]) -> String {
    let entities = serde_json::to_string_pretty(entities).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"Given the following clinical note and the entities already extracted from it, decide whether retrieving clinical guidelines would improve the quality of the final medical report.

## Clinical Note
{note}

## Extracted Entities
{entities}

Answer with a JSON object:
- "needs_retrieval": true or false
- "queries": if true, a list of 1-3 short search queries to find relevant guidelines

{JSON_ONLY}
"#
    )
}

pub fn build_report_prompt(note: &str, patient_data: &str, guidelines: &str) -> String {
    format!(
        r#"Generate a structured medical report based on the following information.

## Patient Data
{patient_data}

## Clinical Note
{note}

## Relevant Guidelines
{guidelines}

Return a JSON object with these sections:
- "patient_summary": brief patient description
- "findings": list of clinical findings
- "assessment": clinical assessment and reasoning
- "plan": recommended plan of care
- "guideline_references": list of guideline excerpts that support the plan

{JSON_ONLY}
"#
    )
}

pub fn build_evaluation_prompt(report: &Report) -> String {
    let report = serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
    format!(
        r#"Evaluate the quality of this medical report.

## Report
{report}

Score each dimension from 1-5 and provide brief feedback:
- "completeness": are all findings addressed?
- "accuracy": is the medical reasoning sound?
- "guideline_adherence": does the plan follow clinical guidelines?
- "clarity": is the report clear and well-structured?
- "overall": overall quality score

Return a JSON object with these fields, each containing "score" (int) and "feedback" (string).

{JSON_ONLY}
"#
    )
}
