//! Integration tests for the artefact stores

use std::sync::Arc;

use tempfile::TempDir;
use weaver_storage::{
    ArtefactStore, ArtefactStoreConfig, FileArtefactStore, InMemoryArtefactStore, StorageError,
    TAG_WIDTH,
};

fn stores() -> (Vec<Box<dyn ArtefactStore>>, TempDir) {
    let temp = TempDir::new().unwrap();
    let file = FileArtefactStore::new(ArtefactStoreConfig::new(temp.path())).unwrap();
    (
        vec![Box::new(InMemoryArtefactStore::new()), Box::new(file)],
        temp,
    )
}

#[test]
fn test_both_backends_agree_on_ids() {
    let (stores, _temp) = stores();
    let ids: Vec<_> = stores
        .iter()
        .map(|store| store.put(b"X", "text").unwrap())
        .collect();
    assert_eq!(ids[0], ids[1]);
}

#[test]
fn test_round_trip_preserves_tag_and_payload() {
    let (stores, _temp) = stores();
    for store in &stores {
        let id = store.put(b"X", "opaque;app$model:Layer").unwrap();
        let resource = store.get(&id).unwrap();
        assert_eq!(resource.tag(), "opaque;app$model:Layer");
        assert_eq!(&resource.payload()[..], b"X");
        assert!(store.contains(&id).unwrap());
    }
}

#[test]
fn test_file_store_writes_once() {
    let temp = TempDir::new().unwrap();
    let store = FileArtefactStore::open(temp.path()).unwrap();

    let first = store.put(b"X", "text").unwrap();
    let second = store.put(b"X", "text").unwrap();

    assert_eq!(first, second);
    let files = std::fs::read_dir(temp.path()).unwrap().count();
    assert_eq!(files, 1);
}

#[test]
fn test_overflowing_tag_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let store = FileArtefactStore::open(temp.path()).unwrap();

    let err = store.put(b"X", &"x".repeat(TAG_WIDTH + 1)).unwrap_err();
    assert!(matches!(err, StorageError::TagOverflow { .. }));
    assert!(store.list_all().unwrap().is_empty());
}

#[test]
fn test_shared_store_through_arc() {
    let store = Arc::new(InMemoryArtefactStore::new());
    let shared = Arc::clone(&store);
    let id = shared.put(b"payload", "bytes").unwrap();
    assert_eq!(store.get(&id).unwrap().tag(), "bytes");
    assert_eq!(store.len(), 1);
}

#[test]
fn test_reopened_store_sees_previous_artefacts() {
    let temp = TempDir::new().unwrap();
    let id = FileArtefactStore::open(temp.path())
        .unwrap()
        .put(b"persisted", "text")
        .unwrap();

    let reopened = FileArtefactStore::open(temp.path()).unwrap();
    assert_eq!(&reopened.get(&id).unwrap().payload()[..], b"persisted");
}
