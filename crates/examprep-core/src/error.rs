use core::result::Result as CoreResult;
use std::io::Error as IoError;
use std::path::PathBuf;

use reqwest::Error as ReqwestError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use toml::de::Error as TomlError;

/// Result type for core operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors that can occur across the exam preparation pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// An HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] ReqwestError),

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] SerdeJsonError),

    /// TOML deserialization failed.
    #[error("TOML deserialization error: {0}")]
    Toml(#[from] TomlError),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A model provider encountered an error.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Required API key was not found.
    #[error("API key not found: {0}")]
    MissingApiKey(String),

    /// Model provider returned an invalid response.
    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),

    /// The embedding backend failed or is unreachable.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// No index has been built at the expected location.
    #[error("No vector index found at {}", .0.display())]
    IndexNotFound(PathBuf),

    /// An index exists (or existed) but cannot be used: closed handle,
    /// partial teardown, or an unreadable generation.
    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    /// Encoding or decoding the persisted index failed.
    #[error("Index persistence error: {0}")]
    Persistence(String),

    /// Upstream text extraction produced nothing usable.
    #[error("Text extraction unavailable: {0}")]
    ExtractionUnavailable(String),

    /// A general error not covered by other variants.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Determines whether this error may succeed if retried.
    ///
    /// Returns `true` for transient errors like network failures or provider errors.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Provider(_))
    }

    /// Whether the caller should prompt for re-ingestion of documents.
    ///
    /// Both a missing index and an unusable one are recovered the same way:
    /// tear down what is left and build again.
    pub fn requires_reingest(&self) -> bool {
        matches!(self, Self::IndexNotFound(_) | Self::IndexUnavailable(_))
    }
}
