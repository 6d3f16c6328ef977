//! Content hashes identifying stored artefacts

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// BLAKE3 hash of a framed artefact
///
/// Equality, ordering and hashing depend on the digest alone. The canonical
/// string form (64 lowercase hex characters) names the artefact's file on
/// disk and is what document form stores under `_id`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtefactId([u8; 32]);

impl ArtefactId {
    /// Wrap a raw digest
    pub const fn from_bytes(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// Hash framed content
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Canonical hex form
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex characters, for logs
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for ArtefactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArtefactId({}..)", self.short())
    }
}

impl fmt::Display for ArtefactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ArtefactId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| CoreError::InvalidArtefactId(s.to_string()))?;
        let hash: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidArtefactId(s.to_string()))?;
        Ok(Self(hash))
    }
}

impl Serialize for ArtefactId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ArtefactId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_content_same_id() {
        assert_eq!(ArtefactId::of(b"payload"), ArtefactId::of(b"payload"));
        assert_ne!(ArtefactId::of(b"payload"), ArtefactId::of(b"other"));
    }

    #[test]
    fn test_hex_round_trip() {
        let id = ArtefactId::of(b"hello");
        let text = id.to_string();
        assert_eq!(text.len(), 64);
        assert_eq!(text.parse::<ArtefactId>().unwrap(), id);
    }

    #[test]
    fn test_parse_rejects_short_hex() {
        assert!("abcd".parse::<ArtefactId>().is_err());
        assert!("zz".repeat(32).parse::<ArtefactId>().is_err());
    }

    #[test]
    fn test_debug_is_short() {
        let debug = format!("{:?}", ArtefactId::of(b"x"));
        assert!(debug.starts_with("ArtefactId("));
        assert!(debug.ends_with("..)"));
    }
}
