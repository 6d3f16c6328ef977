//! File-backed artefact store
//!
//! One file per artefact, named by the hex form of its id, holding the
//! framed bytes (tag field followed by payload).

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, trace, warn};
use weaver_core::ArtefactId;

use crate::ArtefactStore;
use crate::config::ArtefactStoreConfig;
use crate::error::StorageError;
use crate::resource::Resource;

/// Content-addressed artefact store on the local filesystem
#[derive(Debug)]
pub struct FileArtefactStore {
    config: ArtefactStoreConfig,
}

impl FileArtefactStore {
    /// Open a store, creating its base directory when missing
    pub fn new(config: ArtefactStoreConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.base_dir)?;

        info!(path = %config.base_dir.display(), "Artefact store initialized");

        Ok(Self { config })
    }

    /// Open a store rooted at `base_dir` with default settings
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Self::new(ArtefactStoreConfig::new(base_dir))
    }

    pub fn config(&self) -> &ArtefactStoreConfig {
        &self.config
    }

    /// Path of the file holding `id`
    pub fn artefact_path(&self, id: &ArtefactId) -> PathBuf {
        let hash_hex = id.to_hex();

        let mut path = self.config.base_dir.clone();

        for i in 0..self.config.shard_depth as usize {
            let start = i * 2;
            let end = start + 2;
            if end <= hash_hex.len() {
                path.push(&hash_hex[start..end]);
            }
        }

        path.push(&hash_hex);
        path
    }

    /// Every artefact id present on disk
    pub fn list_all(&self) -> Result<Vec<ArtefactId>, StorageError> {
        let mut ids = Vec::new();
        collect_artefacts(&self.config.base_dir, &mut ids)?;
        Ok(ids)
    }

    fn write_atomic(&self, path: &Path, framed: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(framed)?;
        file.sync_all()?;

        fs::rename(&temp_path, path)?;
        Ok(())
    }
}

fn collect_artefacts(dir: &Path, ids: &mut Vec<ArtefactId>) -> Result<(), StorageError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_artefacts(&path, ids)?;
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str())
            && name.len() == 64
            && let Ok(id) = name.parse::<ArtefactId>()
        {
            ids.push(id);
        }
    }
    Ok(())
}

impl ArtefactStore for FileArtefactStore {
    #[instrument(skip(self, payload), fields(size = payload.len()))]
    fn put(&self, payload: &[u8], tag: &str) -> Result<ArtefactId, StorageError> {
        let framed = Resource::new(bytes::Bytes::copy_from_slice(payload), tag).frame()?;
        if framed.len() as u64 > self.config.max_blob_size {
            return Err(StorageError::CapacityExceeded {
                size: framed.len() as u64,
                max: self.config.max_blob_size,
            });
        }

        let id = ArtefactId::of(&framed);
        let path = self.artefact_path(&id);

        if path.exists() {
            trace!(id = %id.short(), "Artefact already stored");
            return Ok(id);
        }

        self.write_atomic(&path, &framed)?;

        debug!(id = %id.short(), "Stored artefact");
        Ok(id)
    }

    #[instrument(skip(self, id), fields(id = %id.short()))]
    fn get(&self, id: &ArtefactId) -> Result<Resource, StorageError> {
        let path = self.artefact_path(id);

        let framed = fs::read(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::NotFound(*id)
            } else {
                StorageError::from(e)
            }
        })?;

        if self.config.verify_on_read {
            let actual = ArtefactId::of(&framed);
            if actual != *id {
                warn!(
                    expected = %id.to_hex(),
                    actual = %actual.to_hex(),
                    "Artefact hash mismatch"
                );
                return Err(StorageError::Integrity {
                    expected: *id,
                    actual,
                });
            }
        }

        Resource::parse(&framed)
    }

    fn contains(&self, id: &ArtefactId) -> Result<bool, StorageError> {
        Ok(self.artefact_path(id).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store(shard_depth: u8) -> (FileArtefactStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config =
            ArtefactStoreConfig::new(temp_dir.path().join("artefacts")).with_shard_depth(shard_depth);
        let store = FileArtefactStore::new(config).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_put_and_get() {
        let (store, _temp) = create_test_store(0);

        let id = store.put(b"Hello, artefacts!", "text").unwrap();
        let resource = store.get(&id).unwrap();

        assert_eq!(resource.tag(), "text");
        assert_eq!(&resource.payload()[..], b"Hello, artefacts!");
    }

    #[test]
    fn test_flat_layout_names_file_by_hex() {
        let (store, temp) = create_test_store(0);

        let id = store.put(b"X", "bytes").unwrap();
        let expected = temp.path().join("artefacts").join(id.to_hex());
        assert_eq!(store.artefact_path(&id), expected);
        assert!(expected.is_file());
    }

    #[test]
    fn test_sharded_layout() {
        let (store, temp) = create_test_store(2);

        let id = store.put(b"sharded", "text").unwrap();
        let hex = id.to_hex();
        let expected = temp
            .path()
            .join("artefacts")
            .join(&hex[0..2])
            .join(&hex[2..4])
            .join(&hex);
        assert!(expected.is_file());
        assert_eq!(store.list_all().unwrap(), vec![id]);
    }

    #[test]
    fn test_content_addressing() {
        let (store, _temp) = create_test_store(0);

        let first = store.put(b"Duplicate content", "text").unwrap();
        let second = store.put(b"Duplicate content", "text").unwrap();

        assert_eq!(first, second);
        assert_eq!(store.list_all().unwrap().len(), 1);
    }

    #[test]
    fn test_hash_verification() {
        let (store, _temp) = create_test_store(0);

        let id = store.put(b"Original data", "text").unwrap();
        fs::write(store.artefact_path(&id), b"Corrupted!").unwrap();

        assert!(matches!(
            store.get(&id),
            Err(StorageError::Integrity { .. })
        ));
    }

    #[test]
    fn test_capacity_exceeded() {
        let temp_dir = TempDir::new().unwrap();
        let config = ArtefactStoreConfig::new(temp_dir.path()).with_max_blob_size(600);
        let store = FileArtefactStore::new(config).unwrap();

        let err = store.put(&[7u8; 200], "bytes").unwrap_err();
        assert!(matches!(
            err,
            StorageError::CapacityExceeded { size: 712, max: 600 }
        ));
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_missing_artefact() {
        let (store, _temp) = create_test_store(0);
        let id = ArtefactId::of(b"never stored");
        assert!(!store.contains(&id).unwrap());
        assert!(matches!(store.get(&id), Err(StorageError::NotFound(_))));
    }
}
