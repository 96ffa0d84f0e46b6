use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use super::{FhirError, Resource};
use super::format::format_patient_name;

pub const CONDITION: &str = "Condition";
pub const MEDICATION_REQUEST: &str = "MedicationRequest";
pub const OBSERVATION: &str = "Observation";
const PATIENT: &str = "Patient";

/// Directory name whose bundle files are never loaded.
const METADATA_DIR: &str = "metadata";

/// `{id, name}` pair returned by [`FhirStore::list_patients`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientSummary {
    pub id: String,
    pub name: String,
}

/// In-memory index of FHIR resources loaded from Bundle JSON files.
///
/// Handles both hand-written collection bundles (`Patient/<id>` references)
/// and Synthea transaction bundles (`urn:uuid:<id>` references). The store is
/// append-only: later bundles add patients and aliases, nothing is removed.
#[derive(Debug, Default)]
pub struct FhirStore {
    /// Patients in load order.
    patients: Vec<(String, Resource)>,
    patient_positions: HashMap<String, usize>,
    /// patient id → resource type → resources
    index: HashMap<String, HashMap<String, Vec<Resource>>>,
    /// Any reference string (fullUrl, `Patient/<id>`) → patient id
    ref_to_patient: HashMap<String, String>,
}

impl FhirStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from every bundle in `dir`.
    pub fn from_directory(dir: &Path) -> Result<Self, FhirError> {
        let mut store = Self::new();
        store.load_directory(dir)?;
        Ok(store)
    }

    /// Load a single Bundle JSON file into the store.
    pub fn load_bundle(&mut self, path: &Path) -> Result<(), FhirError> {
        let raw = std::fs::read_to_string(path).map_err(|source| FhirError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let bundle: Value = serde_json::from_str(&raw).map_err(|source| FhirError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_bundle_value(&bundle, path)
    }

    /// Index an already-parsed bundle. `origin` is only used for error reporting.
    pub fn load_bundle_value(&mut self, bundle: &Value, origin: &Path) -> Result<(), FhirError> {
        if resource_type(bundle) != "Bundle" {
            return Err(FhirError::NotABundle(origin.to_path_buf()));
        }

        let entries: &[Value] = bundle
            .get("entry")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        // Pass 1: register patients and every alias that can point back to them.
        let patients_before = self.patients.len();
        for entry in entries {
            let Some(resource) = entry.get("resource") else {
                continue;
            };
            if resource_type(resource) != PATIENT {
                continue;
            }
            let Some(patient_id) = resource.get("id").and_then(Value::as_str) else {
                tracing::warn!(file = %origin.display(), "Patient resource without id skipped");
                continue;
            };

            self.register_patient(patient_id, resource.clone());

            if let Some(full_url) = entry.get("fullUrl").and_then(Value::as_str) {
                if !full_url.is_empty() {
                    self.ref_to_patient
                        .insert(full_url.to_string(), patient_id.to_string());
                }
            }
            self.ref_to_patient
                .insert(format!("{PATIENT}/{patient_id}"), patient_id.to_string());
        }

        // Pass 2: attach every other resource to its patient.
        let mut indexed = 0usize;
        let mut dropped = 0usize;
        for entry in entries {
            let Some(resource) = entry.get("resource") else {
                continue;
            };
            let res_type = resource_type(resource);
            if res_type == PATIENT {
                continue;
            }

            match self.resolve_patient_id(resource) {
                Some(patient_id) if self.index.contains_key(&patient_id) => {
                    if let Some(by_type) = self.index.get_mut(&patient_id) {
                        by_type
                            .entry(res_type.to_string())
                            .or_default()
                            .push(resource.clone());
                        indexed += 1;
                    }
                }
                _ => dropped += 1,
            }
        }

        tracing::info!(
            file = %origin.display(),
            entries = entries.len(),
            new_patients = self.patients.len() - patients_before,
            indexed,
            dropped,
            "Loaded FHIR bundle"
        );
        Ok(())
    }

    /// Load all `*.json` bundles in `dir` (lexicographic order, not recursive).
    pub fn load_directory(&mut self, dir: &Path) -> Result<(), FhirError> {
        if dir.file_name().and_then(|n| n.to_str()) == Some(METADATA_DIR) {
            tracing::debug!(dir = %dir.display(), "Skipping metadata directory");
            return Ok(());
        }

        let read_dir = std::fs::read_dir(dir).map_err(|source| FhirError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = read_dir
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("json"))
            })
            .collect();
        paths.sort();

        for path in &paths {
            self.load_bundle(path)?;
        }

        tracing::info!(
            dir = %dir.display(),
            files = paths.len(),
            patients = self.patients.len(),
            "FHIR directory loaded"
        );
        Ok(())
    }

    /// `{id, name}` for every loaded patient, in load order.
    pub fn list_patients(&self) -> Vec<PatientSummary> {
        self.patients
            .iter()
            .map(|(id, patient)| PatientSummary {
                id: id.clone(),
                name: format_patient_name(patient),
            })
            .collect()
    }

    pub fn patient_count(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    /// The Patient resource for `patient_id`, if loaded.
    pub fn get_patient(&self, patient_id: &str) -> Option<&Resource> {
        self.patient_positions
            .get(patient_id)
            .map(|&pos| &self.patients[pos].1)
    }

    /// All resources of `resource_type` for a patient. Unknown ids or types yield an empty slice.
    pub fn get_resources(&self, patient_id: &str, resource_type: &str) -> &[Resource] {
        self.index
            .get(patient_id)
            .and_then(|by_type| by_type.get(resource_type))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get_conditions(&self, patient_id: &str) -> &[Resource] {
        self.get_resources(patient_id, CONDITION)
    }

    pub fn get_medications(&self, patient_id: &str) -> &[Resource] {
        self.get_resources(patient_id, MEDICATION_REQUEST)
    }

    pub fn get_observations(&self, patient_id: &str) -> &[Resource] {
        self.get_resources(patient_id, OBSERVATION)
    }

    fn register_patient(&mut self, patient_id: &str, resource: Resource) {
        match self.patient_positions.get(patient_id) {
            Some(&pos) => self.patients[pos].1 = resource,
            None => {
                self.patient_positions
                    .insert(patient_id.to_string(), self.patients.len());
                self.patients.push((patient_id.to_string(), resource));
            }
        }
        self.index.entry(patient_id.to_string()).or_default();
    }

    /// Patient id from a resource's `subject.reference`.
    fn resolve_patient_id(&self, resource: &Resource) -> Option<String> {
        let reference = resource
            .get("subject")
            .and_then(|s| s.get("reference"))
            .and_then(Value::as_str)
            .filter(|r| !r.is_empty())?;

        if let Some(id) = self.ref_to_patient.get(reference) {
            return Some(id.clone());
        }

        reference
            .strip_prefix("Patient/")
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }
}

fn resource_type(resource: &Value) -> &str {
    resource
        .get("resourceType")
        .and_then(Value::as_str)
        .unwrap_or("")
}
