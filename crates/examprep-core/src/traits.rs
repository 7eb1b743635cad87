use std::future::Future;

use async_trait::async_trait;

use crate::{Completion, Result};

/// A single embedding vector
pub type Embedding = Vec<f32>;

/// Trait for language-model backends that turn a prompt into text.
///
/// The pipeline treats the model as opaque: whatever answers the prompt only
/// has to return plain text, possibly with JSON embedded in it.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Sends `prompt` to the model and waits for the full completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unavailable, the request fails,
    /// or the response cannot be parsed.
    async fn invoke(&self, prompt: &str) -> Result<Completion>;
}

/// Trait for generating embeddings from text
pub trait TextEmbedder: Send + Sync {
    /// Name of the embedding model, persisted next to the vectors it produced
    fn model_name(&self) -> &str;

    /// Ensure the embedding model is available
    ///
    /// # Errors
    /// Returns an error if the model is not available or cannot be loaded
    fn ensure_model_available(&self) -> impl Future<Output = Result<()>> + Send;

    /// Generate embedding for text
    ///
    /// # Errors
    /// Returns an error if embedding generation fails
    fn embed(&self, text: &str) -> impl Future<Output = Result<Embedding>> + Send;

    /// Embed multiple texts in one request
    ///
    /// # Errors
    /// Returns an error if any embedding generation fails
    fn embed_batch(
        &self,
        texts: Vec<String>,
    ) -> impl Future<Output = Result<Vec<Embedding>>> + Send;
}
