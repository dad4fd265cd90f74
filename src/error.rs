//! Error types for cloudvault.

use thiserror::Error;

/// Coarse classification of a [`VaultError`], stable across variants.
///
/// Callers that translate failures into user-facing messages or status codes
/// should match on this rather than on the error itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    NotAFolder,
    CycleDetected,
    SelfMove,
    QuotaExceeded,
    InvalidArgument,
    StorageBackend,
    Internal,
}

/// Common error type for cloudvault.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Identifier or share token does not resolve.
    #[error("{0} not found")]
    NotFound(String),

    /// A parent candidate exists but is a file.
    #[error("{0} is not a folder")]
    NotAFolder(String),

    /// The requested move would make a node its own ancestor.
    #[error("cannot move a folder into one of its own descendants")]
    CycleDetected,

    /// The requested move targets the node itself.
    #[error("cannot move a node into itself")]
    SelfMove,

    /// The upload would push the account past its storage ceiling.
    #[error("storage quota exceeded: {used} + {requested} bytes exceeds {quota} bytes")]
    QuotaExceeded {
        used: u64,
        requested: u64,
        quota: u64,
    },

    /// Validation error for caller input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Blob store failure.
    #[error("storage backend error: {0}")]
    StorageBackend(String),

    /// Database error.
    ///
    /// Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl VaultError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::NotFound(_) => ErrorKind::NotFound,
            VaultError::NotAFolder(_) => ErrorKind::NotAFolder,
            VaultError::CycleDetected => ErrorKind::CycleDetected,
            VaultError::SelfMove => ErrorKind::SelfMove,
            VaultError::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            VaultError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            VaultError::StorageBackend(_) => ErrorKind::StorageBackend,
            VaultError::Database(_)
            | VaultError::Io(_)
            | VaultError::Serialization(_)
            | VaultError::Config(_) => ErrorKind::Internal,
        }
    }
}

impl From<sqlx::Error> for VaultError {
    fn from(e: sqlx::Error) -> Self {
        VaultError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(e: serde_json::Error) -> Self {
        VaultError::Serialization(e.to_string())
    }
}

/// Result type alias for cloudvault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
