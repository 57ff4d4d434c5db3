use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::chunking::{ChunkingConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, env_name };
        config.validate_for_env()?;
        tracing::debug!(env = %config.env_name, "configuration loaded");
        Ok(config)
    }

    /// Build from an explicit figment; used by tests and embedders of the library.
    pub fn from_figment(figment: Figment, env_name: impl Into<String>) -> Result<Self> {
        let config = Self { figment, env_name: env_name.into() };
        config.validate_for_env()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    pub fn settings(&self) -> Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| Error::InvalidConfig(format!("Failed to read settings: {}", e)))
    }

    fn validate_for_env(&self) -> Result<()> {
        let settings = self.settings()?;
        settings.validate()?;
        match self.env_name.as_str() {
            "prod" | "production" => {
                if settings.vector.location == MEMORY_LOCATION {
                    return Err(Error::InvalidConfig("vector.location must be durable in production".into()));
                }
            }
            "dev" | "development" | "test" | "testing" => {}
            _ => {}
        }
        Ok(())
    }
}

/// Vector-store location selecting the in-process store.
pub const MEMORY_LOCATION: &str = ":memory:";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ingest: IngestSettings,
    pub retrieval: RetrievalSettings,
    pub vector: VectorSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        crate::chunking::TextSplitter::new(self.ingest.chunking())?;
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be positive".into()));
        }
        self.retrieval.default_mode.parse::<crate::types::RetrievalMode>()?;
        if self.embedding.dim == 0 {
            return Err(Error::InvalidConfig("embedding.dim must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub upload_dir: String,
    /// Directory `ragdb-indexer` walks when none is given.
    pub data_dir: String,
    pub ledger_path: String,
    /// Lexical corpus snapshot, reloaded on start.
    pub corpus_path: String,
    pub max_upload_bytes: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            upload_dir: "uploads".into(),
            data_dir: "data".into(),
            ledger_path: "uploads/hashes.json".into(),
            corpus_path: "uploads/corpus.json".into(),
            max_upload_bytes: 50 * 1024 * 1024,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl IngestSettings {
    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig { chunk_size: self.chunk_size, chunk_overlap: self.chunk_overlap }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub default_mode: String,
    pub top_k: usize,
    pub rrf_k: usize,
    pub graph_enabled: bool,
    /// JSON edge list loaded into the in-memory graph.
    pub graph_path: Option<String>,
}

impl Default for RetrievalSettings {
    fn default() -> Self { Self { default_mode: "hybrid".into(), top_k: 8, rrf_k: 60, graph_enabled: false, graph_path: None } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSettings {
    /// `:memory:` or a LanceDB directory / URI.
    pub location: String,
    pub collection: String,
}

impl Default for VectorSettings {
    fn default() -> Self { Self { location: MEMORY_LOCATION.into(), collection: "documents".into() } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// `hash` (deterministic, model-free) or `candle`.
    pub backend: String,
    pub model_dir: Option<String>,
    pub dim: usize,
    pub max_len: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self { Self { backend: "hash".into(), model_dir: None, dim: 384, max_len: 256 } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub provider: String,
}

impl Default for GenerationSettings {
    fn default() -> Self { Self { provider: "none".into() } }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(toml: &str, env_name: &str) -> Result<Config> {
        Config::from_figment(Figment::new().merge(Toml::string(toml)), env_name)
    }

    #[test]
    fn defaults_apply_when_empty() {
        let settings = config_from("", "test").unwrap().settings().unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.ingest.chunking(), ChunkingConfig::default());
        assert_eq!(settings.retrieval.rrf_k, 60);
    }

    #[test]
    fn sections_override_defaults() {
        let config = config_from("[retrieval]\ntop_k = 3\ndefault_mode = \"lexical\"\n[ingest]\nchunk_size = 100\nchunk_overlap = 10\ndata_dir = \"~/corpus\"\n", "dev").unwrap();
        let settings = config.settings().unwrap();
        assert_eq!(settings.retrieval.top_k, 3);
        assert_eq!(settings.ingest.chunk_size, 100);
        assert_eq!(settings.ingest.data_dir, "~/corpus");
        assert_eq!(Settings::default().ingest.data_dir, "data");
        assert_eq!(config.get::<String>("retrieval.default_mode").unwrap(), "lexical");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(config_from("[retrieval]\ndefault_mode = \"fuzzy\"\n", "dev").is_err());
        assert!(config_from("[ingest]\nchunk_size = 10\nchunk_overlap = 10\n", "dev").is_err());
        assert!(config_from("", "prod").is_err());
        assert!(config_from("[vector]\nlocation = \"/var/lib/ragdb\"\n", "prod").is_ok());
    }
}
