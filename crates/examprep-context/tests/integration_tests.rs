//! Integration tests for examprep-context

#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

#[path = "modules/index_lifecycle.rs"]
mod index_lifecycle;

#[path = "modules/retrieval_pipeline.rs"]
mod retrieval_pipeline;
