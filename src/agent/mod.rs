//! Clinical workflow: a fixed six-node state machine that turns a doctor's
//! note into a structured report and a self-evaluation of it.

pub mod state;
pub mod nodes;
pub mod graph;

pub use state::*;
pub use nodes::*;
pub use graph::*;

use thiserror::Error;

use crate::fhir::FhirError;
use crate::pipeline::llm::LlmError;
use crate::pipeline::rag::RagError;
use crate::pipeline::storage::StorageError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Fhir(#[from] FhirError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Rag(#[from] RagError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
