//! Error types for weaver-engine

use thiserror::Error;
use weaver_core::{CoreError, NodeId, TypeTag};
use weaver_storage::StorageError;

/// Errors raised while weaving, unweaving or reading documents
#[derive(Debug, Error)]
pub enum WeaveError {
    /// Document is missing a required envelope key or has the wrong shape
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// Type tag has no deserializer, catalog entry or opaque decoder
    #[error("Unresolved type: {0}")]
    UnresolvedType(TypeTag),

    /// Cycle marker points at a node that was never built
    #[error("Unresolved cycle marker: {0}")]
    UnresolvedCycleMarker(NodeId),

    /// Artefact tag does not fit the store's tag field
    #[error("Tag of {length} bytes exceeds the {max}-byte tag field")]
    TagOverflow { length: usize, max: usize },

    /// Artefact carries a tag the engine does not write
    #[error("Unknown artefact tag: {0}")]
    UnknownArtefactTag(String),

    /// Serializer or deserializer handed a value of the wrong shape
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Object has neither state nor an opaque encoding
    #[error("Object of type {0} cannot be serialized")]
    Unserializable(TypeTag),

    /// Graph nests deeper than the configured limit
    #[error("Maximum depth of {0} exceeded")]
    DepthExceeded(usize),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Storage error: {0}")]
    Store(StorageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<StorageError> for WeaveError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TagOverflow { length, max } => WeaveError::TagOverflow { length, max },
            other => WeaveError::Store(other),
        }
    }
}

impl WeaveError {
    /// Create a new MalformedDocument error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDocument(message.into())
    }

    /// Create a new TypeMismatch error
    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}
