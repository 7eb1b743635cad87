//! Chunking, embedding and vector retrieval over ingested study material.
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Test allows"
    )
)]

/// Recursive boundary-preferring text chunker
pub mod chunking;
pub mod embedding;
pub mod fs_utils;
/// Persistent vector index with build, open, query and teardown
pub mod index;
pub mod retriever;

pub use chunking::{ChunkerConfig, chunk_text};
pub use embedding::{HashEmbedder, OllamaEmbedder};
pub use fs_utils::force_remove;
pub use index::{
    INDEX_FILE_NAME, IndexHandle, SearchResult, TeardownFailure, TeardownReport, VectorIndex,
    VectorStore,
};
pub use retriever::{join_context, refine_by_keyword, retrieve};
