use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub store: StoreConfig,
    pub ingest: IngestConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            embedding_model: "text-embedding-3-small".into(),
            max_tokens: 1024,
            temperature: 0.3,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub qdrant_url: String,
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            qdrant_url: "http://localhost:6334".into(),
            collection: "papers".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub target_size_words: usize,
    pub overlap_words: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            target_size_words: 250,
            overlap_words: 50,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub chat_top_k: usize,
    pub history_turns: usize,
    pub gap_top_k_per_query: usize,
    pub gap_max_chunks_per_document: usize,
    pub gap_concurrency: usize,
    pub min_score: f32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            chat_top_k: 8,
            history_turns: 2,
            gap_top_k_per_query: 10,
            gap_max_chunks_per_document: 3,
            gap_concurrency: 4,
            min_score: 0.25,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file with `FOLIO_*` env overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("FOLIO_API_KEY") {
            self.llm.api_key = v;
        }
        if let Ok(v) = std::env::var("FOLIO_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("FOLIO_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("FOLIO_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("FOLIO_QDRANT_URL") {
            self.store.qdrant_url = v;
        }
        if let Ok(v) = std::env::var("FOLIO_COLLECTION") {
            self.store.collection = v;
        }
    }
}
