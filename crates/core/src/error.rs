//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid tag: {0}")]
    InvalidTag(String),

    #[error("invalid data item: {0}")]
    InvalidDataItem(String),

    #[error("unsupported signature type: {0}")]
    UnsupportedSignatureType(u16),

    #[error("invalid transaction id: {0}")]
    InvalidTxId(String),

    #[error("chunk {offset}+{size} overlaps a received chunk")]
    ChunkOverlap { offset: u64, size: u64 },

    #[error("chunk {offset}+{size} lies outside the declared size {total}")]
    ChunkOutOfBounds { offset: u64, size: u64, total: u64 },

    #[error("chunk session {id} is incomplete: {missing} byte range(s) missing")]
    IncompleteSession { id: String, missing: usize },

    #[error("chunk session {0} has expired")]
    SessionExpired(String),

    #[error("chunk session {0} is already completed")]
    SessionCompleted(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
