//! Clinical lookup tools over a loaded [`FhirStore`].
//!
//! Each tool returns display text and never fails: unknown patients and empty
//! sections render a fixed message. The workflow's patient-data step and the
//! CLI both go through these.

pub mod interactions;

pub use interactions::*;

use crate::fhir::{
    format_condition, format_medication, format_observation, format_patient, FhirStore, Resource,
};

/// `"Available patients (N):"` followed by one `- Name (ID: id)` line each.
pub fn list_patients_text(store: &FhirStore) -> String {
    let patients = store.list_patients();
    if patients.is_empty() {
        return "No patients found.".to_string();
    }

    let lines: Vec<String> = patients
        .iter()
        .map(|p| format!("- {} (ID: {})", p.name, p.id))
        .collect();
    format!("Available patients ({}):\n{}", patients.len(), lines.join("\n"))
}

/// Demographics block for one patient.
pub fn patient_summary(store: &FhirStore, patient_id: &str) -> String {
    match store.get_patient(patient_id) {
        Some(patient) => format_patient(patient),
        None => format!("Patient not found: {patient_id}"),
    }
}

pub fn conditions_text(store: &FhirStore, patient_id: &str) -> String {
    bulleted_section(
        store.get_conditions(patient_id),
        "Clinical conditions",
        &format!("No conditions recorded for patient {patient_id}."),
        format_condition,
    )
}

pub fn medications_text(store: &FhirStore, patient_id: &str) -> String {
    bulleted_section(
        store.get_medications(patient_id),
        "Medications",
        &format!("No medications recorded for patient {patient_id}."),
        format_medication,
    )
}

pub fn vital_signs_text(store: &FhirStore, patient_id: &str) -> String {
    bulleted_section(
        store.get_observations(patient_id),
        "Vital signs",
        &format!("No vital signs recorded for patient {patient_id}."),
        format_observation,
    )
}

fn bulleted_section(
    resources: &[Resource],
    title: &str,
    empty_message: &str,
    format: fn(&Resource) -> String,
) -> String {
    if resources.is_empty() {
        return empty_message.to_string();
    }

    let lines: Vec<String> = resources.iter().map(|r| format!("- {}", format(r))).collect();
    format!("{title} ({}):\n{}", resources.len(), lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const PATIENT_ID: &str = "patient-joao-001";

    fn store() -> FhirStore {
        let mut store = FhirStore::new();
        store
            .load_bundle(&Path::new(env!("CARGO_MANIFEST_DIR")).join("data/synthea/sample_patient_joao.json"))
            .unwrap();
        store
    }

    #[test]
    fn lists_patients_with_ids() {
        let text = list_patients_text(&store());
        assert!(text.starts_with("Available patients (1):"));
        assert!(text.contains("- João Carlos Silva (ID: patient-joao-001)"));
    }

    #[test]
    fn empty_store_lists_nothing() {
        assert_eq!(list_patients_text(&FhirStore::new()), "No patients found.");
    }

    #[test]
    fn summary_for_known_and_unknown_patient() {
        let store = store();
        let text = patient_summary(&store, PATIENT_ID);
        assert!(text.contains("Name: João Carlos Silva"));
        assert!(text.contains("Gender: Male"));
        assert!(text.contains("São Paulo"));

        assert_eq!(patient_summary(&store, "nobody"), "Patient not found: nobody");
    }

    #[test]
    fn conditions_section_lists_each_condition() {
        let text = conditions_text(&store(), PATIENT_ID);
        assert!(text.starts_with("Clinical conditions (3):"));
        assert!(text.contains("- Essential hypertension - (status: active) - since 2010-06-01"));
        assert!(text.contains("Type 2 diabetes mellitus"));
        assert!(text.contains("Congestive heart failure"));
    }

    #[test]
    fn medications_section_includes_dosage() {
        let text = medications_text(&store(), PATIENT_ID);
        assert!(text.starts_with("Medications (3):"));
        assert!(text.contains("Losartan 50mg - 1 tablet orally once daily - (status: active)"));
        assert!(text.contains("Metformin 850mg"));
    }

    #[test]
    fn vitals_section_renders_components() {
        let text = vital_signs_text(&store(), PATIENT_ID);
        assert!(text.starts_with("Vital signs (4):"));
        assert!(text.contains("Blood pressure - Systolic: 150 mmHg; Diastolic: 95 mmHg"));
        assert!(text.contains("Heart rate: 88 /min"));
        assert!(text.contains("Body weight: 82.5 kg"));
    }

    #[test]
    fn empty_sections_use_fixed_messages() {
        let store = store();
        assert_eq!(
            conditions_text(&store, "nobody"),
            "No conditions recorded for patient nobody."
        );
        assert_eq!(
            medications_text(&store, "nobody"),
            "No medications recorded for patient nobody."
        );
        assert_eq!(
            vital_signs_text(&store, "nobody"),
            "No vital signs recorded for patient nobody."
        );
    }
}
