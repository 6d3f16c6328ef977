//! Tag framing for stored artefacts
//!
//! Every artefact is stored as a fixed-width tag field followed by the raw
//! payload. The tag names the format that produced the payload, so a reader
//! can pick the matching decoder without external metadata.

use bytes::Bytes;
use weaver_core::ArtefactId;

use crate::error::StorageError;

/// Width of the zero-padded tag field, in bytes
pub const TAG_WIDTH: usize = 512;

/// A payload together with its format tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    tag: String,
    payload: Bytes,
}

impl Resource {
    /// Create a resource from a payload and tag
    pub fn new(payload: impl Into<Bytes>, tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            payload: payload.into(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Encode a tag into the fixed-width field
    ///
    /// Rejects tags longer than [`TAG_WIDTH`] and tags containing NUL, which
    /// is reserved for padding.
    pub fn encode_tag(tag: &str) -> Result<[u8; TAG_WIDTH], StorageError> {
        let encoded = tag.as_bytes();
        if encoded.len() > TAG_WIDTH {
            return Err(StorageError::TagOverflow {
                length: encoded.len(),
                max: TAG_WIDTH,
            });
        }
        if encoded.contains(&0) {
            return Err(StorageError::invalid_tag("tag contains a NUL byte"));
        }
        let mut field = [0u8; TAG_WIDTH];
        field[..encoded.len()].copy_from_slice(encoded);
        Ok(field)
    }

    /// Read a tag back from its fixed-width field
    pub fn decode_tag(field: &[u8]) -> Result<String, StorageError> {
        let end = field
            .iter()
            .rposition(|b| *b != 0)
            .map(|i| i + 1)
            .unwrap_or(0);
        String::from_utf8(field[..end].to_vec())
            .map_err(|e| StorageError::invalid_tag(e.to_string()))
    }

    /// Tag field followed by payload
    pub fn frame(&self) -> Result<Vec<u8>, StorageError> {
        let field = Self::encode_tag(&self.tag)?;
        let mut framed = Vec::with_capacity(TAG_WIDTH + self.payload.len());
        framed.extend_from_slice(&field);
        framed.extend_from_slice(&self.payload);
        Ok(framed)
    }

    /// Split framed bytes into tag and payload
    pub fn parse(framed: &[u8]) -> Result<Self, StorageError> {
        if framed.len() < TAG_WIDTH {
            return Err(StorageError::invalid_tag(format!(
                "framed artefact of {} bytes is shorter than the tag field",
                framed.len()
            )));
        }
        let (field, payload) = framed.split_at(TAG_WIDTH);
        Ok(Self {
            tag: Self::decode_tag(field)?,
            payload: Bytes::copy_from_slice(payload),
        })
    }

    /// Content id of the framed form
    pub fn id(&self) -> Result<ArtefactId, StorageError> {
        Ok(ArtefactId::of(&self.frame()?))
    }
}
