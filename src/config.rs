use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Aegis";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Value of `QDRANT_URL` that selects the in-process vector store.
pub const IN_MEMORY_VECTOR_URL: &str = ":memory:";

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "aegis_lib=info,aegis=info,warn"
}

/// Runtime settings. Values come from the environment, optionally seeded
/// from a `.env` file in the working directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub ollama_embed_model: String,
    pub ollama_timeout_secs: u64,
    pub qdrant_url: String,
    pub qdrant_collection: String,
    pub synthea_data_dir: PathBuf,
    pub guidelines_dir: PathBuf,
    pub embedding_dim: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ollama_base_url: "http://localhost:11434".into(),
            ollama_model: "mistral".into(),
            ollama_embed_model: "nomic-embed-text".into(),
            ollama_timeout_secs: 300,
            qdrant_url: "http://localhost:6333".into(),
            qdrant_collection: "clinical_guidelines".into(),
            synthea_data_dir: PathBuf::from("data/synthea"),
            guidelines_dir: PathBuf::from("data/guidelines"),
            embedding_dim: 768,
        }
    }
}

impl Settings {
    /// Load `.env` (if present) and read settings from the process environment.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Missing keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str, default: String| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        Self {
            ollama_base_url: text("OLLAMA_BASE_URL", defaults.ollama_base_url),
            ollama_model: text("OLLAMA_MODEL", defaults.ollama_model),
            ollama_embed_model: text("OLLAMA_EMBED_MODEL", defaults.ollama_embed_model),
            ollama_timeout_secs: parse_or(
                "OLLAMA_TIMEOUT_SECS",
                lookup("OLLAMA_TIMEOUT_SECS"),
                defaults.ollama_timeout_secs,
            ),
            qdrant_url: text("QDRANT_URL", defaults.qdrant_url),
            qdrant_collection: text("QDRANT_COLLECTION", defaults.qdrant_collection),
            synthea_data_dir: lookup("SYNTHEA_DATA_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.synthea_data_dir),
            guidelines_dir: lookup("GUIDELINES_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.guidelines_dir),
            embedding_dim: parse_or(
                "EMBEDDING_DIM",
                lookup("EMBEDDING_DIM"),
                defaults.embedding_dim,
            ),
        }
    }

    /// True when guideline vectors should live in process memory instead of Qdrant.
    pub fn uses_in_memory_vectors(&self) -> bool {
        self.qdrant_url == IN_MEMORY_VECTOR_URL
    }
}

fn parse_or<T: std::str::FromStr + Copy>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %value, "Invalid numeric setting, using default");
            default
        }),
    }
}
