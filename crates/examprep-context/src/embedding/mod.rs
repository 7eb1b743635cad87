//! Embedding backends implementing [`TextEmbedder`](examprep_core::TextEmbedder).

mod hash;
mod ollama;

pub use hash::HashEmbedder;
pub use ollama::OllamaEmbedder;
