//! Error types for weaver-core

use thiserror::Error;

/// Errors raised while parsing core identifiers or restoring object state
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Version string did not follow `N`, `N.N` or `N.N.N`
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    /// Type tag string did not follow `seg$seg:Name`
    #[error("Invalid type tag: {0}")]
    InvalidTypeTag(String),

    /// Artefact id was not 64 hex characters
    #[error("Invalid artefact id: {0}")]
    InvalidArtefactId(String),

    /// A state map could not be applied to an object
    #[error("State error: {0}")]
    State(String),

    /// Opaque encoding or decoding failed
    #[error("Codec error: {0}")]
    Codec(String),
}

impl CoreError {
    /// Create a new State error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    /// Create a State error for a field that is absent from a state map
    pub fn missing_field(field: &str) -> Self {
        Self::State(format!("missing field `{field}`"))
    }

    /// Create a State error for a field holding the wrong shape
    pub fn field_type(field: &str, expected: &str) -> Self {
        Self::State(format!("field `{field}` is not {expected}"))
    }
}

impl From<postcard::Error> for CoreError {
    fn from(err: postcard::Error) -> Self {
        CoreError::Codec(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        let err = CoreError::missing_field("name");
        assert!(matches!(err, CoreError::State(_)));
        assert!(err.to_string().contains("`name`"));
    }

    #[test]
    fn test_field_type_message() {
        let err = CoreError::field_type("count", "an integer");
        assert_eq!(err.to_string(), "State error: field `count` is not an integer");
    }
}
