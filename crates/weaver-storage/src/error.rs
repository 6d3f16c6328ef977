//! Error types for weaver-storage
//!
//! This module defines the error types used throughout the storage crate.

use thiserror::Error;
use weaver_core::ArtefactId;

/// Errors that can occur in artefact store operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error during storage operations
    #[error("I/O error: {0}")]
    Io(String),

    /// Requested artefact was not found
    #[error("Artefact not found: {0}")]
    NotFound(ArtefactId),

    /// Tag does not fit the fixed-width tag field
    #[error("Tag of {length} bytes exceeds the {max}-byte tag field")]
    TagOverflow { length: usize, max: usize },

    /// Tag could not be framed or read back
    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    /// Stored content no longer hashes to its id
    #[error("Integrity check failed: expected {expected}, found {actual}")]
    Integrity {
        expected: ArtefactId,
        actual: ArtefactId,
    },

    /// Blob is larger than the configured maximum
    #[error("Artefact of {size} bytes exceeds capacity of {max} bytes")]
    CapacityExceeded { size: u64, max: u64 },
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl StorageError {
    /// Create a new I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Create a new InvalidTag error
    pub fn invalid_tag(message: impl Into<String>) -> Self {
        Self::InvalidTag(message.into())
    }
}
