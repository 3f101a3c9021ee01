//! Error types for cell_stats

use thiserror::Error;

/// Result type alias for cell_stats operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, loading or rendering cells
///
/// Traversal and stats arithmetic never fail; these cover the glue around them.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    #[error("Invalid bit string: {0}")]
    InvalidBits(String),

    #[error("Cell overflow: {0}")]
    CellOverflow(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Document has no root cells")]
    EmptyDocument,

    #[error("Invalid cell bag file: {0}")]
    InvalidFile(String),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Invalid storage stats: {0}")]
    ParseStats(String),
}
