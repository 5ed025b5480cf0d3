//! Error types for metatab operations.

use thiserror::Error;

/// Result type alias using MetatabError.
pub type MetatabResult<T> = Result<T, MetatabError>;

/// Primary error type for metadata and projection operations.
#[derive(Debug, Error)]
pub enum MetatabError {
    // === Coordinate graph errors ===
    #[error("coordinate dependency graph is cyclic")]
    GraphIsCyclic,

    #[error("index must have at least one base coordinate")]
    EmptyBaseSet,

    // === Entry container errors ===
    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    // === Header codec errors ===
    #[error("assertion failed: {0}")]
    AssertionFailed(String),

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    // === Projection errors ===
    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    // === Ambient errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl MetatabError {
    /// Construct a KeyNotFound error for the given key.
    pub fn key_not_found(key: impl Into<String>) -> Self {
        MetatabError::KeyNotFound(key.into())
    }
}
