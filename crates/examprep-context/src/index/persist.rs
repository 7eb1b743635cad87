//! On-disk format of the vector index.

use bincode::config::standard as bincode_config;
use bincode::{Decode, Encode, decode_from_slice, encode_to_vec};
use examprep_core::{Chunk, Error, Result};
use std::fs::{self, File};
use std::io::{ErrorKind, Read as _};
use std::path::Path;
use uuid::Uuid;

/// One indexed chunk and its embedding
#[derive(Debug, Clone, Encode, Decode)]
pub struct IndexEntry {
    /// Opaque identifier assigned at insertion
    pub id: String,
    /// Chunk content
    pub text: String,
    /// Position in the chunk sequence it was built from
    pub order: usize,
    /// Byte offset in the source text
    pub start: usize,
    /// Embedding vector
    pub embedding: Vec<f32>,
}

impl IndexEntry {
    pub fn new(chunk: &Chunk, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: chunk.text.clone(),
            order: chunk.order,
            start: chunk.start,
            embedding,
        }
    }

    pub fn to_chunk(&self) -> Chunk {
        Chunk::new(self.text.clone(), self.order, self.start)
    }
}

/// Persisted index generation
#[derive(Debug, Encode, Decode)]
pub struct IndexFile {
    /// Format version
    pub version: u32,
    /// Embedding model the vectors were produced with
    pub embedding_model: String,
    /// Indexed chunks, in insertion order
    pub entries: Vec<IndexEntry>,
}

impl IndexFile {
    /// Format version identifier
    pub const VERSION: u32 = 1;

    pub fn new(embedding_model: &str, entries: Vec<IndexEntry>) -> Self {
        Self {
            version: Self::VERSION,
            embedding_model: embedding_model.to_owned(),
            entries,
        }
    }
}

/// Open and decode the index file at `path`, returning the still-open file.
///
/// # Errors
/// `IndexNotFound` (carrying `root`) when the file does not exist,
/// `IndexUnavailable` when it cannot be decoded or has another version.
pub fn read_index(path: &Path, root: &Path) -> Result<(File, IndexFile)> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            return Err(Error::IndexNotFound(root.to_path_buf()));
        }
        Err(error) => return Err(error.into()),
    };

    let mut data = Vec::new();
    file.read_to_end(&mut data)?;

    let (contents, _): (IndexFile, usize) = decode_from_slice(&data, bincode_config())
        .map_err(|error| {
            Error::IndexUnavailable(format!("Failed to decode {}: {error}", path.display()))
        })?;

    if contents.version != IndexFile::VERSION {
        return Err(Error::IndexUnavailable(format!(
            "{} has format version {}, expected {}",
            path.display(),
            contents.version,
            IndexFile::VERSION
        )));
    }

    Ok((file, contents))
}

/// Encode `contents` and write it to `path`, creating parent directories.
///
/// # Errors
/// Returns an error if encoding or writing fails.
pub fn write_index(path: &Path, contents: &IndexFile) -> Result<usize> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let bytes = encode_to_vec(contents, bincode_config())
        .map_err(|error| Error::Persistence(format!("Failed to encode index: {error}")))?;
    fs::write(path, &bytes)?;
    Ok(bytes.len())
}
