//! Tag vocabulary for artefacts written by the engine

use std::fmt;

use weaver_core::TypeTag;

use crate::error::WeaveError;

const OPAQUE_PREFIX: &str = "opaque;";
const TEXT_TAG: &str = "text";
const BYTES_TAG: &str = "bytes";

/// What an artefact's payload holds, as recorded in its tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtefactKind {
    /// An object's own opaque encoding
    Opaque(TypeTag),
    /// Externalized documentation, UTF-8
    Text,
    /// A large byte string
    Bytes,
}

impl ArtefactKind {
    /// Tag written into the artefact header
    pub fn to_tag(&self) -> String {
        match self {
            ArtefactKind::Opaque(tag) => format!("{OPAQUE_PREFIX}{tag}"),
            ArtefactKind::Text => TEXT_TAG.to_string(),
            ArtefactKind::Bytes => BYTES_TAG.to_string(),
        }
    }

    /// Read a kind back from an artefact header tag
    pub fn parse(tag: &str) -> Result<Self, WeaveError> {
        if let Some(type_tag) = tag.strip_prefix(OPAQUE_PREFIX) {
            let type_tag = type_tag
                .parse()
                .map_err(|_| WeaveError::UnknownArtefactTag(tag.to_string()))?;
            return Ok(ArtefactKind::Opaque(type_tag));
        }
        match tag {
            TEXT_TAG => Ok(ArtefactKind::Text),
            BYTES_TAG => Ok(ArtefactKind::Bytes),
            _ => Err(WeaveError::UnknownArtefactTag(tag.to_string())),
        }
    }
}

impl fmt::Display for ArtefactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_tag())
    }
}
