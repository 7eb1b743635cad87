//! Core types and traits for the exam preparation pipeline.
//!
//! This crate provides the error taxonomy, the capability traits for text
//! generation and embedding, and the domain types shared by the indexing,
//! generation and grading crates.
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

/// Configuration loading and defaults.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// Prompt templates embedded at compile time.
pub mod prompts;
/// Poison-tolerant locking helpers.
pub mod sync;
/// Capability traits for model and embedding backends.
pub mod traits;
/// Domain data types: chunks, questions and evaluations.
pub mod types;

pub use config::ExamPrepConfig;
pub use error::{Error, Result};
pub use prompts::PromptTemplate;
pub use sync::IgnoreLock;
pub use traits::{Embedding, TextEmbedder, TextGenerator};
pub use types::{
    Chunk, Completion, Evaluation, Question, QuestionType, ShapeError, TokenUsage,
};
