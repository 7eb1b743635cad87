//! Embedding generation through a local Ollama server.

use core::fmt::{Debug, Display};
use examprep_core::config::EmbeddingConfig;
use examprep_core::{Embedding, Error, Result, TextEmbedder};
use ollama_rs::Ollama;
use ollama_rs::generation::embeddings::request::GenerateEmbeddingsRequest;
use tokio::process::Command;
use tracing::info;

/// Ollama embedding client
pub struct OllamaEmbedder {
    ollama: Ollama,
    model: String,
}

impl OllamaEmbedder {
    /// Create a client for `model` served at `host:port`.
    pub fn new(host: impl Into<String>, port: u16, model: impl Into<String>) -> Self {
        Self {
            ollama: Ollama::new(host.into(), port),
            model: model.into(),
        }
    }

    /// Create a client from the `[embedding]` config section.
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(config.host.clone(), config.port, config.model.clone())
    }

    fn map_embedding_error(&self, error: &(impl Debug + Display)) -> Error {
        let error_str = format!("{error:?}");
        if error_str.contains("model") && error_str.contains("not found") {
            Error::Embedding(format!(
                "Embedding model '{}' not found. Run: ollama pull {}",
                self.model, self.model
            ))
        } else {
            Error::Embedding(format!("Embedding generation failed: {error}"))
        }
    }
}

impl TextEmbedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn ensure_model_available(&self) -> Result<()> {
        let models = self.ollama.list_local_models().await.map_err(|error| {
            Error::Embedding(format!(
                "Failed to connect to Ollama: {error}.\n\nPlease ensure Ollama is installed and running:\n  - Install from: https://ollama.ai\n  - Start with: ollama serve"
            ))
        })?;

        if models.iter().any(|model| model.name.contains(&self.model)) {
            return Ok(());
        }

        info!("Embedding model '{}' not found, pulling it", self.model);
        let status = Command::new("ollama")
            .args(["pull", &self.model])
            .status()
            .await
            .map_err(|error| {
                Error::Embedding(format!(
                    "Failed to run 'ollama pull {}': {error}. Is Ollama installed?",
                    self.model
                ))
            })?;

        if !status.success() {
            return Err(Error::Embedding(format!(
                "Failed to pull model '{}'. Check Ollama is running.",
                self.model
            )));
        }

        info!("Pulled embedding model '{}'", self.model);
        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        let request = GenerateEmbeddingsRequest::new(self.model.clone(), text.to_owned().into());

        let response = self
            .ollama
            .generate_embeddings(request)
            .await
            .map_err(|error| self.map_embedding_error(&error))?;

        response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("No embeddings returned".to_owned()))
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let expected = texts.len();
        let request = GenerateEmbeddingsRequest::new(self.model.clone(), texts.into());

        let response = self
            .ollama
            .generate_embeddings(request)
            .await
            .map_err(|error| self.map_embedding_error(&error))?;

        if response.embeddings.len() != expected {
            return Err(Error::Embedding(format!(
                "Expected {expected} embeddings, Ollama returned {}",
                response.embeddings.len()
            )));
        }

        Ok(response.embeddings)
    }
}
