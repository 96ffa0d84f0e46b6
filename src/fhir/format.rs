//! Plain-text renderings of FHIR resources for prompts and the CLI.
//!
//! Every formatter is total: missing or oddly-shaped fields degrade to a
//! partial line or the [`UNKNOWN`] marker, never to an error.

use chrono::NaiveDate;
use serde_json::Value;

use super::Resource;

/// Marker used when a name or code cannot be read from a resource.
pub const UNKNOWN: &str = "Unknown";

/// First `name` entry as `"Given Given Family"`, or [`UNKNOWN`].
pub fn format_patient_name(patient: &Resource) -> String {
    let Some(name) = patient
        .get("name")
        .and_then(Value::as_array)
        .and_then(|names| names.first())
    else {
        return UNKNOWN.to_string();
    };

    let given = name
        .get("given")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();
    let family = str_field(name, "family");

    let full = format!("{given} {family}");
    let full = full.trim();
    if full.is_empty() {
        UNKNOWN.to_string()
    } else {
        full.to_string()
    }
}

/// Demographics block: name, gender, birth date (with age) and first address.
pub fn format_patient(patient: &Resource) -> String {
    format_patient_on(patient, chrono::Local::now().date_naive())
}

/// Same as [`format_patient`], computing age relative to `today`.
pub fn format_patient_on(patient: &Resource, today: NaiveDate) -> String {
    let name = format_patient_name(patient);
    let gender = match str_field(patient, "gender") {
        "male" => "Male",
        "female" => "Female",
        other => other,
    };

    let birth = str_field(patient, "birthDate");
    let age = NaiveDate::parse_from_str(birth, "%Y-%m-%d")
        .ok()
        .map(|born| format!(" ({} years)", (today - born).num_days() / 365))
        .unwrap_or_default();

    let mut lines = vec![
        format!("Name: {name}"),
        format!("Gender: {gender}"),
        format!("Birth date: {birth}{age}"),
    ];

    if let Some(address) = patient
        .get("address")
        .and_then(Value::as_array)
        .and_then(|a| a.first())
    {
        let street = address
            .get("line")
            .and_then(Value::as_array)
            .map(|l| {
                l.iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        let parts: Vec<&str> = [
            street.as_str(),
            str_field(address, "city"),
            str_field(address, "state"),
        ]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect();
        lines.push(format!("Address: {}", parts.join(" - ")));
    }

    lines.join("\n")
}

/// `"<condition> - (status: <code>) - since <onset>"`
pub fn format_condition(condition: &Resource) -> String {
    let mut parts = vec![codeable_text(condition.get("code"))];

    let status = condition
        .get("clinicalStatus")
        .and_then(|s| s.get("coding"))
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .map(|c| str_field(c, "code"))
        .unwrap_or("");
    if !status.is_empty() {
        parts.push(format!("(status: {status})"));
    }

    let onset = str_field(condition, "onsetDateTime");
    if !onset.is_empty() {
        parts.push(format!("since {onset}"));
    }

    parts.join(" - ")
}

/// `"<medication> - <dosage texts> - (status: <status>)"`
pub fn format_medication(medication: &Resource) -> String {
    let mut parts = vec![codeable_text(medication.get("medicationCodeableConcept"))];

    let dosage: Vec<&str> = medication
        .get("dosageInstruction")
        .and_then(Value::as_array)
        .map(|d| {
            d.iter()
                .map(|instr| str_field(instr, "text"))
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();
    if !dosage.is_empty() {
        parts.push(dosage.join(", "));
    }

    let status = str_field(medication, "status");
    if !status.is_empty() {
        parts.push(format!("(status: {status})"));
    }

    parts.join(" - ")
}

/// Single vital-sign line. Simple quantities render as `"Heart rate: 88 /min"`,
/// component panels (blood pressure) as `"Blood pressure - Systolic: 150 mmHg; ..."`.
pub fn format_observation(observation: &Resource) -> String {
    let text = codeable_text(observation.get("code"));

    if let Some(quantity) = observation.get("valueQuantity").filter(|q| q.is_object()) {
        return format!("{text}: {}", format_quantity(quantity));
    }

    let components: Vec<String> = observation
        .get("component")
        .and_then(Value::as_array)
        .map(|comps| {
            comps
                .iter()
                .filter_map(|comp| {
                    let quantity = comp.get("valueQuantity").filter(|q| q.is_object())?;
                    let label = comp
                        .get("code")
                        .map(|c| str_field(c, "text"))
                        .unwrap_or("");
                    Some(format!("{label}: {}", format_quantity(quantity)))
                })
                .collect()
        })
        .unwrap_or_default();

    let has_components = observation
        .get("component")
        .and_then(Value::as_array)
        .is_some_and(|comps| !comps.is_empty());
    if has_components {
        return format!("{text} - {}", components.join("; "));
    }

    text
}

/// `code.text`, else the first coding's display, else [`UNKNOWN`].
fn codeable_text(concept: Option<&Value>) -> String {
    let Some(concept) = concept else {
        return UNKNOWN.to_string();
    };
    let text = str_field(concept, "text");
    if !text.is_empty() {
        return text.to_string();
    }
    concept
        .get("coding")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .and_then(|c| c.get("display"))
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN)
        .to_string()
}

fn format_quantity(quantity: &Value) -> String {
    let value = match quantity.get("value") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    format!("{value} {}", str_field(quantity, "unit"))
        .trim_end()
        .to_string()
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn name_joins_given_and_family() {
        let patient = json!({"name": [{"given": ["João", "Carlos"], "family": "Silva"}]});
        assert_eq!(format_patient_name(&patient), "João Carlos Silva");
    }

    #[test]
    fn name_degrades_gracefully() {
        assert_eq!(format_patient_name(&json!({})), UNKNOWN);
        assert_eq!(format_patient_name(&json!({"name": []})), UNKNOWN);
        assert_eq!(format_patient_name(&json!({"name": [{}]})), UNKNOWN);
        assert_eq!(format_patient_name(&json!({"name": [{"given": ["Ana"]}]})), "Ana");
        assert_eq!(format_patient_name(&json!({"name": [{"family": "Souza"}]})), "Souza");
        assert_eq!(format_patient_name(&json!({"name": "not-a-list"})), UNKNOWN);
    }

    #[test]
    fn patient_block_includes_age_and_address() {
        let patient = json!({
            "name": [{"given": ["João"], "family": "Silva"}],
            "gender": "male",
            "birthDate": "1960-03-15",
            "address": [{"line": ["Rua A, 1"], "city": "São Paulo", "state": "SP"}]
        });
        let today = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        let text = format_patient_on(&patient, today);
        assert!(text.contains("Name: João Silva"));
        assert!(text.contains("Gender: Male"));
        assert!(text.contains("Birth date: 1960-03-15 (65 years)"));
        assert!(text.contains("Address: Rua A, 1 - São Paulo - SP"));
    }

    #[test]
    fn patient_block_tolerates_bad_birth_date() {
        let patient = json!({"gender": "other", "birthDate": "15/03/1960"});
        let text = format_patient(&patient);
        assert!(text.contains("Gender: other"));
        assert!(text.contains("Birth date: 15/03/1960"));
        assert!(!text.contains("years"));
        assert!(!text.contains("Address"));
    }

    #[test]
    fn condition_line_has_status_and_onset() {
        let condition = json!({
            "code": {"text": "Essential hypertension"},
            "clinicalStatus": {"coding": [{"code": "active"}]},
            "onsetDateTime": "2010-06-01"
        });
        assert_eq!(
            format_condition(&condition),
            "Essential hypertension - (status: active) - since 2010-06-01"
        );
    }

    #[test]
    fn condition_falls_back_to_coding_display() {
        let condition = json!({"code": {"coding": [{"display": "Asthma"}]}});
        assert_eq!(format_condition(&condition), "Asthma");
        assert_eq!(format_condition(&json!({})), UNKNOWN);
    }

    #[test]
    fn medication_line_has_dosage_and_status() {
        let med = json!({
            "medicationCodeableConcept": {"text": "Losartan 50mg"},
            "dosageInstruction": [{"text": "once daily"}, {"timing": {}}],
            "status": "active"
        });
        assert_eq!(
            format_medication(&med),
            "Losartan 50mg - once daily - (status: active)"
        );
    }

    #[test]
    fn observation_simple_quantity() {
        let obs = json!({
            "code": {"text": "Body weight"},
            "valueQuantity": {"value": 82.5, "unit": "kg"}
        });
        assert_eq!(format_observation(&obs), "Body weight: 82.5 kg");
    }

    #[test]
    fn observation_component_panel() {
        let obs = json!({
            "code": {"text": "Blood pressure"},
            "component": [
                {"code": {"text": "Systolic"}, "valueQuantity": {"value": 150, "unit": "mmHg"}},
                {"code": {"text": "Diastolic"}, "valueQuantity": {"value": 95, "unit": "mmHg"}},
                {"code": {"text": "Position"}}
            ]
        });
        assert_eq!(
            format_observation(&obs),
            "Blood pressure - Systolic: 150 mmHg; Diastolic: 95 mmHg"
        );
    }

    #[test]
    fn observation_without_value_is_just_the_name() {
        let obs = json!({"code": {"coding": [{"display": "Smoking status"}]}});
        assert_eq!(format_observation(&obs), "Smoking status");
    }

    #[test]
    fn observation_with_empty_component_list_is_just_the_name() {
        let obs = json!({"code": {"text": "Blood pressure"}, "component": []});
        assert_eq!(format_observation(&obs), "Blood pressure");
    }
}
