//! # Weaver Storage
//!
//! Content-addressed artefact store for Weaver.
//!
//! Large or opaque payloads are written out of the woven tree into an
//! artefact store and referenced by [`ArtefactId`], the BLAKE3 hash of the
//! framed bytes. Every artefact carries a short format tag in a fixed-width
//! header so it can be decoded without extra metadata.
//!
//! ## Backends
//!
//! - [`InMemoryArtefactStore`]: concurrent map, for tests and ephemeral use
//! - [`FileArtefactStore`]: one file per artefact under a base directory
//!
//! ## Example
//!
//! ```rust
//! use weaver_storage::{ArtefactStore, InMemoryArtefactStore};
//!
//! let store = InMemoryArtefactStore::new();
//! let id = store.put(b"hello", "text").unwrap();
//! let resource = store.get(&id).unwrap();
//! assert_eq!(resource.tag(), "text");
//! ```

pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod resource;

pub use config::{ARTEFACT_DIR_ENV, ArtefactStoreConfig};
pub use error::StorageError;
pub use file::FileArtefactStore;
pub use memory::InMemoryArtefactStore;
pub use resource::{Resource, TAG_WIDTH};
pub use weaver_core::ArtefactId;

/// Content-addressed storage for tagged payloads
///
/// Storing the same (payload, tag) pair twice yields the same id and keeps
/// a single copy.
pub trait ArtefactStore {
    /// Frame `payload` under `tag`, store it and return its id
    fn put(&self, payload: &[u8], tag: &str) -> Result<ArtefactId, StorageError>;

    /// Fetch an artefact by id
    fn get(&self, id: &ArtefactId) -> Result<Resource, StorageError>;

    /// Whether an artefact with this id is present
    fn contains(&self, id: &ArtefactId) -> Result<bool, StorageError>;
}

impl<S: ArtefactStore + ?Sized> ArtefactStore for &S {
    fn put(&self, payload: &[u8], tag: &str) -> Result<ArtefactId, StorageError> {
        (**self).put(payload, tag)
    }

    fn get(&self, id: &ArtefactId) -> Result<Resource, StorageError> {
        (**self).get(id)
    }

    fn contains(&self, id: &ArtefactId) -> Result<bool, StorageError> {
        (**self).contains(id)
    }
}

impl<S: ArtefactStore + ?Sized> ArtefactStore for std::sync::Arc<S> {
    fn put(&self, payload: &[u8], tag: &str) -> Result<ArtefactId, StorageError> {
        (**self).put(payload, tag)
    }

    fn get(&self, id: &ArtefactId) -> Result<Resource, StorageError> {
        (**self).get(id)
    }

    fn contains(&self, id: &ArtefactId) -> Result<bool, StorageError> {
        (**self).contains(id)
    }
}
