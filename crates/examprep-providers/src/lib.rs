//! Provider adapters for language-model services.
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        reason = "Test allows"
    )
)]

/// Groq provider implementation.
pub mod groq;
/// Scripted provider for tests and offline runs.
pub mod mock;

pub use groq::GroqProvider;
pub use mock::MockProvider;
