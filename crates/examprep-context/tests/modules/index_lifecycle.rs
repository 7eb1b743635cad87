//! Build, close, teardown and rebuild of an index generation.

use examprep_context::{HashEmbedder, INDEX_FILE_NAME, VectorIndex};
use examprep_core::{Chunk, Error};
use std::fs;
use tempfile::TempDir;

fn chunk_set(texts: &[&str]) -> Vec<Chunk> {
    texts
        .iter()
        .enumerate()
        .map(|(order, text)| Chunk::new(*text, order, 0))
        .collect()
}

#[tokio::test]
async fn test_teardown_then_rebuild_discards_prior_generation() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("vector_store");
    let index = VectorIndex::new(&root, HashEmbedder::default());

    let mut handle = index
        .build(&chunk_set(&["Old notes about volcanoes.", "Magma and lava."]))
        .await
        .unwrap();
    assert!(root.join(INDEX_FILE_NAME).exists());
    handle.close();

    let report = index.teardown();
    assert!(report.is_clean());
    assert!(matches!(index.open().await, Err(Error::IndexNotFound(_))));

    let rebuilt = index
        .build(&chunk_set(&["New notes about osmosis."]))
        .await
        .unwrap();
    assert_eq!(rebuilt.len(), 1);

    let hits = index.query(&rebuilt, "volcanoes", 5).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].text, "New notes about osmosis.");
}

#[tokio::test]
async fn test_corrupt_index_requires_reingest() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("vector_store");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join(INDEX_FILE_NAME), b"\x00\x01garbage").unwrap();

    let index = VectorIndex::new(&root, HashEmbedder::default());
    let error = index.open().await.unwrap_err();
    assert!(error.requires_reingest());

    let report = index.teardown();
    assert!(report.is_clean());
    assert!(!root.exists());
}

#[tokio::test]
async fn test_reopen_after_close() {
    let temp = TempDir::new().unwrap();
    let index = VectorIndex::new(temp.path().join("vector_store"), HashEmbedder::default());
    let mut handle = index
        .build(&chunk_set(&["Cells divide by mitosis."]))
        .await
        .unwrap();
    handle.close();

    let reopened = index.open().await.unwrap();
    assert!(reopened.is_open());
    assert_eq!(reopened.len(), 1);
}
