//! Error types for meshprep

use thiserror::Error;

/// Main error type for meshprep operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Fewer than 3 valid vertices, or a non-finite bounding box.
    #[error("Malformed geometry: {0}")]
    MalformedGeometry(String),

    #[error("Vertex weld failed: {0}")]
    WeldFailure(String),

    #[error("Edge split failed: {0}")]
    SplitFailure(String),

    #[error("Simplification failed: {0}")]
    SimplifyFailure(String),

    #[error("Asset is busy: an optimize pass is already running")]
    Busy,

    #[error("Invalid asset state: expected {expected}, found {found}")]
    InvalidState { expected: String, found: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for meshprep operations
pub type Result<T> = std::result::Result<T, Error>;
