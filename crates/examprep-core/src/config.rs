//! Configuration types for chunking, retrieval, generation, grading and storage.

use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use toml::{from_str, to_string_pretty};
use tracing::debug;

use crate::{Error, Result};

/// Env var overriding the state directory.
const ENV_STATE_FOLDER: &str = "EXAMPREP_FOLDER";
/// Env var key for the Groq API key.
const ENV_GROQ_API_KEY: &str = "GROQ_API_KEY";
/// Env var overriding the embedding model.
const ENV_EMBEDDING_MODEL: &str = "EMBEDDING_MODEL";
/// Env var overriding the Ollama host.
const ENV_OLLAMA_HOST: &str = "OLLAMA_HOST";

/// Complete application configuration.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExamPrepConfig {
    /// Text chunking parameters
    pub chunking: ChunkingConfig,
    /// Retrieval parameters
    pub retrieval: RetrievalConfig,
    /// Question generation parameters
    pub generation: GenerationConfig,
    /// Answer grading parameters
    pub evaluation: EvaluationConfig,
    /// Embedding backend
    pub embedding: EmbeddingConfig,
    /// On-disk layout
    pub storage: StorageConfig,
    /// API keys for model providers
    pub api_keys: ApiKeys,
}

/// Chunk size and overlap, in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk
    pub size: usize,
    /// Characters shared between consecutive chunks
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: 800,
            overlap: 100,
        }
    }
}

/// Retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of nearest chunks fetched per query
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// Question generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Maximum model invocations per generation request
    pub max_retries: usize,
    /// Questions requested when the caller does not say
    pub default_questions: usize,
    /// Model used for generation
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            default_questions: 10,
            model: "llama-3.3-70b-versatile".to_owned(),
            temperature: 0.7,
        }
    }
}

/// Answer grading configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Grading attempts per answer; 1 keeps the single-invocation contract
    pub max_attempts: usize,
    /// Model used for grading
    pub model: String,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            model: "llama-3.3-70b-versatile".to_owned(),
        }
    }
}

/// Embedding backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Ollama embedding model
    pub model: String,
    /// Ollama host, including scheme
    pub host: String,
    /// Ollama port
    pub port: u16,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text".to_owned(),
            host: "http://localhost".to_owned(),
            port: 11434,
        }
    }
}

/// Storage layout, relative to the state directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the vector index generation
    pub index_dir: PathBuf,
    /// File holding the exam session
    pub session_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("vector_store"),
            session_file: PathBuf::from("session.json"),
        }
    }
}

/// API keys for model providers.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiKeys {
    /// Groq API key
    pub groq_api_key: Option<String>,
}

impl ExamPrepConfig {
    /// Get the state directory (`$EXAMPREP_FOLDER`, else `~/.examprep`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn state_dir() -> Result<PathBuf> {
        if let Ok(folder) = env::var(ENV_STATE_FOLDER) {
            return Ok(PathBuf::from(folder));
        }
        let home =
            home_dir().ok_or_else(|| Error::Config("Could not determine home directory".to_owned()))?;
        Ok(home.join(".examprep"))
    }

    /// Get the default config file path (`<state dir>/config.toml`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::state_dir()?.join("config.toml"))
    }

    /// Load config from the default location, creating it with defaults on first run
    ///
    /// # Errors
    /// Returns an error if the config cannot be read or created
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path()?;

        let config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            let config = Self::default();
            config.save_to_file(&config_path)?;
            config
        };

        Ok(config.with_env_overrides())
    }

    /// Load config from a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = from_str(&contents)?;

        debug!(
            "Loaded config from {:?}: groq_api_key={}",
            path,
            if config.api_keys.groq_api_key.is_some() {
                "present"
            } else {
                "missing"
            }
        );

        Ok(config)
    }

    /// Save config to a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = to_string_pretty(self)
            .map_err(|error| Error::Config(format!("Failed to serialize config: {error}")))?;

        let header = "# ExamPrep Configuration File\n\
                      # This file is automatically generated on first run\n\
                      # Edit this file to customize your settings\n\n";

        fs::write(path, format!("{header}{contents}"))?;

        Ok(())
    }

    /// Apply `EMBEDDING_MODEL` / `OLLAMA_HOST` overrides
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = env::var(ENV_EMBEDDING_MODEL) {
            self.embedding.model = model;
        }
        if let Ok(host) = env::var(ENV_OLLAMA_HOST) {
            self.embedding.host = host;
        }
        self
    }

    /// Groq API key from the config file, falling back to `GROQ_API_KEY`
    pub fn groq_api_key(&self) -> Option<String> {
        self.api_keys
            .groq_api_key
            .clone()
            .or_else(|| env::var(ENV_GROQ_API_KEY).ok())
            .filter(|key| !key.is_empty())
    }

    /// Absolute location of the vector index under `state_dir`
    pub fn index_path(&self, state_dir: &Path) -> PathBuf {
        state_dir.join(&self.storage.index_dir)
    }

    /// Absolute location of the session file under `state_dir`
    pub fn session_path(&self, state_dir: &Path) -> PathBuf {
        state_dir.join(&self.storage.session_file)
    }
}
