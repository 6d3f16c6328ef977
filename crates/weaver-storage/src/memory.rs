//! In-memory artefact store
//!
//! Suitable for tests and for short-lived processes that never need the
//! artefacts on disk.

use bytes::Bytes;
use dashmap::DashMap;
use tracing::{debug, trace};
use weaver_core::ArtefactId;

use crate::ArtefactStore;
use crate::error::StorageError;
use crate::resource::Resource;

/// Artefact store backed by a concurrent map of framed blobs
#[derive(Debug, Default)]
pub struct InMemoryArtefactStore {
    blobs: DashMap<ArtefactId, Bytes>,
}

impl InMemoryArtefactStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct artefacts held
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Ids of every stored artefact
    pub fn ids(&self) -> Vec<ArtefactId> {
        self.blobs.iter().map(|entry| *entry.key()).collect()
    }
}

impl ArtefactStore for InMemoryArtefactStore {
    fn put(&self, payload: &[u8], tag: &str) -> Result<ArtefactId, StorageError> {
        let framed = Resource::new(Bytes::copy_from_slice(payload), tag).frame()?;
        let id = ArtefactId::of(&framed);

        if self.blobs.contains_key(&id) {
            trace!(id = %id.short(), "Artefact already stored");
            return Ok(id);
        }

        self.blobs.insert(id, Bytes::from(framed));
        debug!(id = %id.short(), tag, size = payload.len(), "Stored artefact");
        Ok(id)
    }

    fn get(&self, id: &ArtefactId) -> Result<Resource, StorageError> {
        let framed = self
            .blobs
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or(StorageError::NotFound(*id))?;
        Resource::parse(&framed)
    }

    fn contains(&self, id: &ArtefactId) -> Result<bool, StorageError> {
        Ok(self.blobs.contains_key(id))
    }
}
