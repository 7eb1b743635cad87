//! In-memory similarity search over indexed chunks.

use core::cmp::Ordering;
use examprep_core::Chunk;

use super::persist::IndexEntry;

/// A chunk with its similarity to the query.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Matched chunk
    pub chunk: Chunk,
    /// Cosine similarity to the query (-1.0 to 1.0)
    pub score: f32,
}

/// Ordered collection of indexed chunks.
///
/// Entries keep their insertion order, which breaks ties between equally
/// similar chunks.
#[derive(Debug, Default)]
pub struct VectorStore {
    entries: Vec<IndexEntry>,
}

impl VectorStore {
    pub(crate) fn from_entries(entries: Vec<IndexEntry>) -> Self {
        Self { entries }
    }

    /// Search for the `top_k` chunks most similar to `query_embedding`, best first
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Vec<SearchResult> {
        let mut scores: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, cosine_similarity(query_embedding, &entry.embedding)))
            .collect();

        // Stable sort keeps insertion order among equal scores
        scores.sort_by(|first, second| second.1.partial_cmp(&first.1).unwrap_or(Ordering::Equal));

        scores
            .into_iter()
            .take(top_k)
            .map(|(position, score)| SearchResult {
                chunk: self.entries[position].to_chunk(),
                score,
            })
            .collect()
    }

    /// Get number of stored chunks
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Calculate cosine similarity between two vectors
pub(crate) fn cosine_similarity(vector_a: &[f32], vector_b: &[f32]) -> f32 {
    if vector_a.len() != vector_b.len() {
        return 0.0;
    }

    let dot_product: f32 = vector_a
        .iter()
        .zip(vector_b.iter())
        .map(|(left, right)| left * right)
        .sum();
    let magnitude_a = vector_a.iter().map(|value| value * value).sum::<f32>().sqrt();
    let magnitude_b = vector_b.iter().map(|value| value * value).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}
