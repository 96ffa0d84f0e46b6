pub mod store;
pub mod format;

pub use store::*;
pub use format::*;

use std::path::PathBuf;

use thiserror::Error;

/// A FHIR resource as loaded from a bundle. Resources are heterogeneous, so
/// they stay as JSON and are read through the helpers in [`format`].
pub type Resource = serde_json::Value;

#[derive(Error, Debug)]
pub enum FhirError {
    #[error("Not a FHIR Bundle: {0}")]
    NotABundle(PathBuf),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
