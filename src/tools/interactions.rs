//! Pairwise drug-interaction lookup over a small fixed table.

/// Known interacting pairs. Order within a pair is irrelevant.
const DRUG_INTERACTIONS: &[(&str, &str, &str)] = &[
    (
        "losartan",
        "spironolactone",
        "Risk of hyperkalemia. Monitor serum potassium regularly.",
    ),
    (
        "losartan",
        "enalapril",
        "Dual RAAS blockade. Increased risk of hypotension, hyperkalemia and renal failure. Avoid the combination.",
    ),
    (
        "metformin",
        "iodinated contrast",
        "Risk of lactic acidosis. Withhold metformin 48h before and after procedures with iodinated contrast.",
    ),
    (
        "metformin",
        "alcohol",
        "Increased risk of lactic acidosis. Advise the patient to avoid excessive alcohol intake.",
    ),
    (
        "losartan",
        "ibuprofen",
        "NSAIDs reduce the antihypertensive effect and increase the risk of kidney injury. Avoid prolonged use.",
    ),
    (
        "losartan",
        "diclofenac",
        "NSAIDs reduce the antihypertensive effect and increase the risk of kidney injury. Avoid prolonged use.",
    ),
    (
        "hydrochlorothiazide",
        "lithium",
        "Thiazides reduce renal lithium excretion. Risk of lithium toxicity. Monitor serum levels.",
    ),
    (
        "hydrochlorothiazide",
        "digoxin",
        "Thiazide-induced hypokalemia potentiates digitalis toxicity. Monitor potassium and digoxin.",
    ),
];

fn normalize_drug_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Interaction description for a pair of drugs, regardless of argument order.
pub fn check_interaction(drug_a: &str, drug_b: &str) -> Option<&'static str> {
    let a = normalize_drug_name(drug_a);
    let b = normalize_drug_name(drug_b);

    DRUG_INTERACTIONS
        .iter()
        .find(|(x, y, _)| (*x == a && *y == b) || (*x == b && *y == a))
        .map(|(_, _, description)| *description)
}

/// Human-readable verdict, echoing the names as the caller gave them.
pub fn interaction_text(drug_a: &str, drug_b: &str) -> String {
    match check_interaction(drug_a, drug_b) {
        Some(description) => {
            format!("Interaction found between {drug_a} and {drug_b}:\n{description}")
        }
        None => format!(
            "No known interaction between {drug_a} and {drug_b}.\n\
             Note: this check only covers a short list of common interactions. \
             Consult a complete pharmacology reference for a definitive answer."
        ),
    }
}
