use std::path::PathBuf;

use clap::{Parser, Subcommand};

use aegis_lib::agent::{AgentError, AgentState, ClinicalAgent};
use aegis_lib::config::{self, Settings};
use aegis_lib::fhir::FhirStore;
use aegis_lib::pipeline::llm::{LlmGateway, OllamaClient};
use aegis_lib::pipeline::storage::{
    GuidelineIngestion, InMemoryVectorStore, OllamaEmbedder, QdrantStore, RecursiveChunker,
    StorageError,
};
use aegis_lib::tools;

/// Characters of guideline and patient context shown with `--verbose`.
const PREVIEW_CHARS: usize = 500;

/// Aegis clinical-note assistant.
#[derive(Parser)]
#[command(name = "aegis", version, about = "Clinical-note assistant backed by Ollama and Qdrant")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the clinical workflow on a doctor's note.
    Run {
        /// Note text (quote it).
        #[arg(long)]
        note: String,
        /// Show intermediate state from each step.
        #[arg(long)]
        verbose: bool,
    },
    /// Load, chunk, embed and store guideline documents.
    Ingest {
        /// Directory of .txt/.md/.pdf files. Defaults to GUIDELINES_DIR.
        dir: Option<PathBuf>,
    },
    /// List loaded patients.
    Patients,
    /// Demographics for one patient.
    Patient { id: String },
    /// Clinical conditions for one patient.
    Conditions { id: String },
    /// Medication requests for one patient.
    Medications { id: String },
    /// Vital-sign observations for one patient.
    Vitals { id: String },
    /// Check a drug pair against the interaction table.
    Interaction { drug_a: String, drug_b: String },
}

fn main() {
    aegis_lib::init_tracing();
    let cli = Cli::parse();
    let settings = Settings::from_env();
    tracing::debug!(version = config::APP_VERSION, "{} starting", config::APP_NAME);

    if let Err(e) = dispatch(cli.command, &settings) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn dispatch(command: Command, settings: &Settings) -> Result<(), AgentError> {
    match command {
        Command::Run { note, verbose } => run_note(settings, &note, verbose),
        Command::Ingest { dir } => {
            let dir = dir.unwrap_or_else(|| settings.guidelines_dir.clone());
            ingest(settings, &dir)
        }
        Command::Patients => {
            println!("{}", tools::list_patients_text(&load_store(settings)?));
            Ok(())
        }
        Command::Patient { id } => {
            println!("{}", tools::patient_summary(&load_store(settings)?, &id));
            Ok(())
        }
        Command::Conditions { id } => {
            println!("{}", tools::conditions_text(&load_store(settings)?, &id));
            Ok(())
        }
        Command::Medications { id } => {
            println!("{}", tools::medications_text(&load_store(settings)?, &id));
            Ok(())
        }
        Command::Vitals { id } => {
            println!("{}", tools::vital_signs_text(&load_store(settings)?, &id));
            Ok(())
        }
        Command::Interaction { drug_a, drug_b } => {
            println!("{}", tools::interaction_text(&drug_a, &drug_b));
            Ok(())
        }
    }
}

fn load_store(settings: &Settings) -> Result<FhirStore, AgentError> {
    Ok(FhirStore::from_directory(&settings.synthea_data_dir)?)
}

fn ingest(settings: &Settings, dir: &std::path::Path) -> Result<(), AgentError> {
    let embedder = OllamaEmbedder::from_settings(settings)?;
    let stored = if settings.uses_in_memory_vectors() {
        tracing::warn!("QDRANT_URL is :memory:, ingested vectors last only for this process");
        GuidelineIngestion::new(RecursiveChunker::default(), embedder, InMemoryVectorStore::new())
            .ingest_directory(dir)?
    } else {
        GuidelineIngestion::new(
            RecursiveChunker::default(),
            embedder,
            QdrantStore::from_settings(settings)?,
        )
        .ingest_directory(dir)?
    };
    println!("Stored {stored} guideline chunks from {}", dir.display());
    Ok(())
}

fn run_note(settings: &Settings, note: &str, verbose: bool) -> Result<(), AgentError> {
    let store = load_store(settings)?;
    let gateway = LlmGateway::new(OllamaClient::from_settings(settings)?, &settings.ollama_model);
    gateway.ensure_model_available()?;
    let embedder = OllamaEmbedder::from_settings(settings)?;

    let state = if settings.uses_in_memory_vectors() {
        let ingestion = GuidelineIngestion::new(
            RecursiveChunker::default(),
            OllamaEmbedder::from_settings(settings)?,
            InMemoryVectorStore::new(),
        );
        match ingestion.ingest_directory(&settings.guidelines_dir) {
            Ok(_) => {}
            Err(StorageError::NoDocuments(dir)) => {
                tracing::warn!(dir = %dir.display(), "No guidelines to index, retrieval will find nothing");
            }
            Err(e) => return Err(e.into()),
        }
        let index = ingestion.into_vector_store();
        ClinicalAgent::new(&gateway, &embedder, &index, &store).run(note)?
    } else {
        let index = QdrantStore::from_settings(settings)?;
        ClinicalAgent::new(&gateway, &embedder, &index, &store).run(note)?
    };

    if verbose {
        print_intermediate(&state);
    }

    println!("=== Clinical report ===");
    println!("{}", pretty(&state.report));
    println!();
    println!("=== Quality evaluation ===");
    println!("{}", pretty(&state.evaluation));
    Ok(())
}

fn print_intermediate(state: &AgentState) {
    println!("=== Extracted entities ===");
    for entity in state.entities() {
        println!("  - {} ({})", entity.text, entity.entity_type);
    }
    println!();
    println!(
        "Patient identified: {}",
        state.identified_patient().unwrap_or("N/A")
    );
    println!("Retrieval needed: {}", state.wants_retrieval());
    if !state.queries().is_empty() {
        println!("Search queries:");
        for query in state.queries() {
            println!("  - {query}");
        }
    }
    if let Some(guidelines) = state.guidelines.as_deref() {
        println!();
        println!("Guidelines found:\n{}", preview(guidelines));
    }
    if let Some(patient_data) = state.patient_data.as_deref() {
        println!();
        println!("Patient data:\n{}", preview(patient_data));
    }
    println!();
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{head}...")
}

fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unprintable: {e}>"))
}
