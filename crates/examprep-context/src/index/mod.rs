//! The vector index lives in one directory holding a single `index.bin`.
//! A generation is built by appending to whatever is already there, so a
//! full rebuild is `teardown` followed by `build`.

mod persist;
mod store;

pub use store::{SearchResult, VectorStore};

use examprep_core::{Chunk, Error, Result, TextEmbedder};
use std::fs::File;
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::fs_utils::force_remove;
use persist::{IndexEntry, IndexFile, read_index, write_index};

/// Name of the index file inside the index directory
pub const INDEX_FILE_NAME: &str = "index.bin";

/// Persistent vector index over text chunks.
///
/// The embedding function is injected; the same embedder must be used to
/// build and to query a generation.
pub struct VectorIndex<E> {
    /// Directory holding the index generation
    root: PathBuf,
    /// Embedding backend
    embedder: E,
}

/// An open index generation.
///
/// Holds the index file open until [`IndexHandle::close`] is called or the
/// handle is dropped.
#[derive(Debug)]
pub struct IndexHandle {
    file: Option<File>,
    store: VectorStore,
    path: PathBuf,
}

impl IndexHandle {
    /// Whether the handle can still be queried
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Number of indexed chunks (0 once closed)
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the index holds no chunks
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Location of the index file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the index file and the loaded vectors. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.file.take().is_some() {
            self.store = VectorStore::default();
            debug!("Closed vector index at {}", self.path.display());
        }
    }

    fn store(&self) -> Result<&VectorStore> {
        if self.file.is_none() {
            return Err(Error::IndexUnavailable(format!(
                "index handle for {} is closed",
                self.path.display()
            )));
        }
        Ok(&self.store)
    }
}

/// A path that could not be removed during teardown.
#[derive(Debug, Clone)]
pub struct TeardownFailure {
    /// Path that was left behind
    pub path: PathBuf,
    /// Why removal failed
    pub message: String,
}

/// Outcome of [`VectorIndex::teardown`].
#[derive(Debug, Clone, Default)]
pub struct TeardownReport {
    /// Number of files and directories removed
    pub removed: usize,
    /// Entries that could not be removed
    pub failures: Vec<TeardownFailure>,
}

impl TeardownReport {
    /// Whether everything was removed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record_failure(&mut self, path: PathBuf, message: String) {
        warn!("Failed to remove {}: {message}", path.display());
        self.failures.push(TeardownFailure { path, message });
    }
}

impl<E: TextEmbedder> VectorIndex<E> {
    /// Create an index rooted at `root` using `embedder`.
    pub fn new(root: impl Into<PathBuf>, embedder: E) -> Self {
        Self {
            root: root.into(),
            embedder,
        }
    }

    /// Directory holding the index generation
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Embedding backend in use
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    fn index_file(&self) -> PathBuf {
        self.root.join(INDEX_FILE_NAME)
    }

    /// Embed `chunks`, append them to the persisted index and open it.
    ///
    /// # Errors
    /// Returns an error if embedding fails, if an existing index at this
    /// location is unreadable or was built with another embedding model, or
    /// if the index cannot be written.
    pub async fn build(&self, chunks: &[Chunk]) -> Result<IndexHandle> {
        let mut entries = match self.load().await {
            Ok(existing) => existing.entries,
            Err(Error::IndexNotFound(_)) => Vec::new(),
            Err(error) => return Err(error),
        };
        let existing = entries.len();

        if !chunks.is_empty() {
            self.embedder.ensure_model_available().await?;

            let texts = chunks.iter().map(|chunk| chunk.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(texts).await?;
            if embeddings.len() != chunks.len() {
                return Err(Error::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    chunks.len(),
                    embeddings.len()
                )));
            }

            entries.extend(
                chunks
                    .iter()
                    .zip(embeddings)
                    .map(|(chunk, embedding)| IndexEntry::new(chunk, embedding)),
            );
        }

        let path = self.index_file();
        let contents = IndexFile::new(self.embedder.model_name(), entries);
        let bytes = spawn_blocking(move || write_index(&path, &contents))
            .await
            .map_err(|error| Error::Other(format!("Task join error: {error}")))??;

        info!(
            "Indexed {} chunks ({} already present, {bytes} bytes) at {}",
            chunks.len(),
            existing,
            self.root.display()
        );

        self.open().await
    }

    /// Open the persisted index.
    ///
    /// # Errors
    /// `IndexNotFound` if nothing was built here, `IndexUnavailable` if the
    /// index cannot be decoded or was built with another embedding model.
    pub async fn open(&self) -> Result<IndexHandle> {
        let path = self.index_file();
        let root = self.root.clone();
        let read_path = path.clone();
        let (file, contents) = spawn_blocking(move || read_index(&read_path, &root))
            .await
            .map_err(|error| Error::Other(format!("Task join error: {error}")))??;

        self.check_model(&contents)?;
        debug!(
            "Opened vector index with {} chunks at {}",
            contents.entries.len(),
            path.display()
        );

        Ok(IndexHandle {
            file: Some(file),
            store: VectorStore::from_entries(contents.entries),
            path,
        })
    }

    async fn load(&self) -> Result<IndexFile> {
        let path = self.index_file();
        let root = self.root.clone();
        let (_file, contents) = spawn_blocking(move || read_index(&path, &root))
            .await
            .map_err(|error| Error::Other(format!("Task join error: {error}")))??;

        self.check_model(&contents)?;
        Ok(contents)
    }

    fn check_model(&self, contents: &IndexFile) -> Result<()> {
        if contents.entries.is_empty() || contents.embedding_model == self.embedder.model_name() {
            return Ok(());
        }
        Err(Error::IndexUnavailable(format!(
            "index was built with embedding model '{}', current model is '{}'",
            contents.embedding_model,
            self.embedder.model_name()
        )))
    }

    /// Return up to `top_k` chunks nearest to `text`, best first.
    ///
    /// # Errors
    /// `IndexUnavailable` if the handle is closed, or an embedding error.
    pub async fn query(&self, handle: &IndexHandle, text: &str, top_k: usize) -> Result<Vec<Chunk>> {
        let store = handle.store()?;
        if top_k == 0 || store.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(text).await?;
        Ok(store
            .search(&embedding, top_k)
            .into_iter()
            .map(|hit| hit.chunk)
            .collect())
    }

    /// Delete the index directory and everything in it.
    ///
    /// The index file goes first, so an interrupted teardown never leaves an
    /// index that still opens. Failures are logged and reported, never
    /// returned. Callers must close any open handle beforehand.
    pub fn teardown(&self) -> TeardownReport {
        let mut report = TeardownReport::default();
        if !self.root.exists() {
            debug!("No vector index to tear down at {}", self.root.display());
            return report;
        }

        let index_file = self.index_file();
        if index_file.exists() {
            match force_remove(&index_file) {
                Ok(()) => report.removed += 1,
                Err(error) => report.record_failure(index_file, error.to_string()),
            }
        }

        for entry in WalkDir::new(&self.root).contents_first(true) {
            match entry {
                Ok(entry) => match force_remove(entry.path()) {
                    Ok(()) => report.removed += 1,
                    Err(error) => report.record_failure(entry.path().to_path_buf(), error.to_string()),
                },
                Err(error) => {
                    let path = error
                        .path()
                        .map_or_else(|| self.root.clone(), Path::to_path_buf);
                    report.record_failure(path, error.to_string());
                }
            }
        }

        info!(
            "Tore down vector index at {} ({} removed, {} failed)",
            self.root.display(),
            report.removed,
            report.failures.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HashEmbedder;
    use std::fs;
    use tempfile::TempDir;

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .enumerate()
            .map(|(order, text)| Chunk::new(*text, order, 0))
            .collect()
    }

    #[tokio::test]
    async fn test_open_before_build_is_not_found() {
        let temp = TempDir::new().unwrap();
        let index = VectorIndex::new(temp.path().join("store"), HashEmbedder::default());

        let error = index.open().await.unwrap_err();
        assert!(matches!(error, Error::IndexNotFound(_)));
    }

    #[tokio::test]
    async fn test_build_is_additive() {
        let temp = TempDir::new().unwrap();
        let index = VectorIndex::new(temp.path().join("store"), HashEmbedder::default());

        let first = index.build(&chunks(&["cells divide"])).await.unwrap();
        assert_eq!(first.len(), 1);
        let second = index.build(&chunks(&["water moves", "light absorbed"])).await.unwrap();
        assert_eq!(second.len(), 3);
    }

    #[tokio::test]
    async fn test_closed_handle_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let index = VectorIndex::new(temp.path().join("store"), HashEmbedder::default());
        let mut handle = index.build(&chunks(&["cells divide"])).await.unwrap();

        handle.close();
        handle.close();
        assert!(!handle.is_open());

        let error = index.query(&handle, "cells", 3).await.unwrap_err();
        assert!(matches!(error, Error::IndexUnavailable(_)));
    }

    #[tokio::test]
    async fn test_model_mismatch_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("store");
        let entry = IndexEntry::new(&Chunk::new("cells", 0, 0), vec![1.0]);
        write_index(&root.join(INDEX_FILE_NAME), &IndexFile::new("other-model", vec![entry]))
            .unwrap();

        let index = VectorIndex::new(root, HashEmbedder::default());
        let error = index.open().await.unwrap_err();
        assert!(matches!(error, Error::IndexUnavailable(_)));
    }

    #[tokio::test]
    async fn test_teardown_then_open_is_not_found() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("store");
        let index = VectorIndex::new(&root, HashEmbedder::default());
        let mut handle = index.build(&chunks(&["cells divide"])).await.unwrap();
        fs::create_dir_all(root.join("segments")).unwrap();
        fs::write(root.join("segments").join("extra.bin"), b"leftover").unwrap();

        handle.close();
        let report = index.teardown();

        assert!(report.is_clean());
        assert!(report.removed >= 4);
        assert!(!root.exists());
        let error = index.open().await.unwrap_err();
        assert!(matches!(error, Error::IndexNotFound(_)));
    }

    #[test]
    fn test_teardown_without_index_is_noop() {
        let temp = TempDir::new().unwrap();
        let index = VectorIndex::new(temp.path().join("missing"), HashEmbedder::default());

        let report = index.teardown();
        assert!(report.is_clean());
        assert_eq!(report.removed, 0);
    }
}
