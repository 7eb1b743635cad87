//! Deterministic hash-based embeddings.
//!
//! Each lowercase alphanumeric token is hashed with SHA-256 into one of a
//! fixed number of buckets, giving a bag-of-words vector. The bucket of a
//! token never changes between builds, so persisted indexes stay comparable. Texts sharing vocabulary score as
//! similar under cosine similarity, which is enough for offline use and for
//! tests that need stable rankings without an Ollama server.

use examprep_core::{Embedding, Result, TextEmbedder};
use sha2::{Digest as _, Sha256};

/// Default vector width, matching common small embedding models
const DEFAULT_DIMENSIONS: usize = 384;

/// Embedder that needs no model server.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Model name recorded in indexes built with this embedder
    pub const MODEL_NAME: &'static str = "hash-bow-sha256";

    /// Create an embedder producing `dimensions`-wide vectors (at least 1).
    #[must_use]
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Vector width
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed `text` synchronously.
    #[must_use]
    pub fn embed_sync(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0_f32; self.dimensions];
        let lowered = text.to_lowercase();

        for token in lowered
            .split(|ch: char| !ch.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let bucket = (bucket_hash(token) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }

        vector
    }
}

/// First eight bytes of the token's SHA-256 digest, big-endian
fn bucket_hash(token: &str) -> u64 {
    let digest = Sha256::digest(token.as_bytes());
    digest
        .iter()
        .take(8)
        .fold(0, |acc, byte| (acc << 8) | u64::from(*byte))
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::with_dimensions(DEFAULT_DIMENSIONS)
    }
}

impl TextEmbedder for HashEmbedder {
    fn model_name(&self) -> &str {
        Self::MODEL_NAME
    }

    async fn ensure_model_available(&self) -> Result<()> {
        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|text| self.embed_sync(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_is_deterministic() {
        let embedder = HashEmbedder::default();
        let first = embedder.embed_sync("Chlorophyll absorbs light");
        let second = embedder.embed_sync("chlorophyll ABSORBS light!");

        assert_eq!(first.len(), 384);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedding = HashEmbedder::with_dimensions(8).embed_sync("  ...  ");
        assert_eq!(embedding, vec![0.0; 8]);
    }

    #[test]
    fn test_token_counts_accumulate() {
        let embedder = HashEmbedder::with_dimensions(16);
        let total: f32 = embedder.embed_sync("cell cell membrane").iter().sum();
        assert!((total - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_buckets_are_pinned() {
        let wide = HashEmbedder::with_dimensions(1024).embed_sync("Osmosis photosynthesis");
        assert!((wide[385] - 1.0).abs() < f32::EPSILON);
        assert!((wide[764] - 1.0).abs() < f32::EPSILON);

        let default = HashEmbedder::default().embed_sync("osmosis");
        assert!((default[257] - 1.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let embedder = HashEmbedder::default();
        let batch = embedder
            .embed_batch(vec!["osmosis".to_owned(), "diffusion".to_owned()])
            .await
            .unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], embedder.embed("osmosis").await.unwrap());
    }
}
