//! Error types for card_provider

use std::path::PathBuf;
use thiserror::Error;

/// Failures that reach callers of the provider.
///
/// Only configuration problems are reported this way. Unknown cards,
/// unreachable image hosts and cancellation all degrade to "no data".
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// A source table lacks one or more of the columns the resolver needs
    #[error(
        "{} is missing one or more key columns (required: {}; missing: {}). \
         Check your data files and restart.",
        path.display(),
        required.join(", "),
        missing.join(", ")
    )]
    MissingColumns {
        path: PathBuf,
        required: Vec<String>,
        missing: Vec<String>,
    },
    /// A source table could not be opened or its header could not be read
    #[error("Failed to read table {}: {message}", path.display())]
    Table { path: PathBuf, message: String },
    /// The shared HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
    /// The blocking scan worker died before returning
    #[error("Table scan aborted: {0}")]
    ScanAborted(String),
}

impl ProviderError {
    pub(crate) fn table(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        ProviderError::Table {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Why a single image download produced nothing.
///
/// Never leaves the image layer: callers of the provider only ever see an
/// absent image.
#[derive(Debug, Error)]
pub enum FetchFailure {
    /// Connection, TLS or timeout failure
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Host answered with a non-success status
    #[error("HTTP error: {0}")]
    Status(reqwest::StatusCode),
    /// Body was not a decodable image
    #[error("Image error: {0}")]
    Malformed(#[from] image::ImageError),
    /// Caller cancelled before the request was issued
    #[error("Fetch cancelled")]
    Cancelled,
    /// Record carries no identifier for this face
    #[error("No image source for this card")]
    NoSource,
}

/// Result alias for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;
