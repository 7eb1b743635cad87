//! Split documents into bounded, overlapping chunks.
//!
//! The text is first cut into pieces no longer than the chunk size, trying
//! paragraph, line, sentence and word boundaries in turn and only falling
//! back to a hard character cut when none of them fit. Pieces are then merged
//! greedily into chunks, carrying a tail of at most `overlap` characters from
//! one chunk into the next.
//!
//! Every chunk is an exact slice of the input, so no text is dropped or
//! rewritten by chunking.

use examprep_core::config::ChunkingConfig;
use examprep_core::{Chunk, Error, Result};

/// Boundaries tried in order, coarsest first
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Chunk size and overlap, both in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Maximum characters per chunk
    size: usize,
    /// Maximum characters shared by consecutive chunks
    overlap: usize,
}

impl ChunkerConfig {
    /// Create a chunker configuration.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if `size` is zero or `overlap` is not smaller than `size`.
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::Config("chunk size must be greater than zero".to_owned()));
        }
        if overlap >= size {
            return Err(Error::Config(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({size})"
            )));
        }
        Ok(Self { size, overlap })
    }

    /// Build from the `[chunking]` config section.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the configured values are inconsistent.
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.size, config.overlap)
    }

    /// Maximum characters per chunk
    pub fn size(&self) -> usize {
        self.size
    }

    /// Maximum characters shared by consecutive chunks
    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            size: 800,
            overlap: 100,
        }
    }
}

/// A contiguous byte range of the source text that fits in one chunk.
#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
    chars: usize,
}

/// Chunk `text` according to `config`.
///
/// Empty text yields no chunks; text that fits in one chunk yields exactly one.
#[must_use]
pub fn chunk_text(text: &str, config: &ChunkerConfig) -> Vec<Chunk> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut pieces = Vec::new();
    split_into_pieces(text, 0, config.size, &SEPARATORS, &mut pieces);
    merge_pieces(text, &pieces, config)
}

/// Recursively cut `text` (located at byte `base` of the source) into pieces
/// of at most `size` characters.
fn split_into_pieces(
    text: &str,
    base: usize,
    size: usize,
    separators: &[&str],
    pieces: &mut Vec<Piece>,
) {
    let chars = text.chars().count();
    if chars <= size {
        pieces.push(Piece {
            start: base,
            end: base + text.len(),
            chars,
        });
        return;
    }

    let Some((separator, finer)) = separators.split_first() else {
        hard_cut(text, base, size, pieces);
        return;
    };

    // The separator stays attached to the end of the part it terminates
    let mut offset = base;
    for part in text.split_inclusive(separator) {
        split_into_pieces(part, offset, size, finer, pieces);
        offset += part.len();
    }
}

/// Cut `text` every `size` characters.
fn hard_cut(text: &str, base: usize, size: usize, pieces: &mut Vec<Piece>) {
    let mut piece_start = 0;
    let mut count = 0;

    for (index, _) in text.char_indices() {
        if count == size {
            pieces.push(Piece {
                start: base + piece_start,
                end: base + index,
                chars: count,
            });
            piece_start = index;
            count = 0;
        }
        count += 1;
    }

    if count > 0 {
        pieces.push(Piece {
            start: base + piece_start,
            end: base + text.len(),
            chars: count,
        });
    }
}

/// Greedily pack consecutive pieces into chunks with a bounded overlap tail.
fn merge_pieces(text: &str, pieces: &[Piece], config: &ChunkerConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut first = 0;
    let mut window_chars = 0;

    for (index, piece) in pieces.iter().enumerate() {
        if window_chars > 0 && window_chars + piece.chars > config.size {
            push_chunk(text, &pieces[first..index], &mut chunks);

            while first < index
                && (window_chars > config.overlap || window_chars + piece.chars > config.size)
            {
                window_chars -= pieces[first].chars;
                first += 1;
            }
        }
        window_chars += piece.chars;
    }

    if first < pieces.len() {
        push_chunk(text, &pieces[first..], &mut chunks);
    }

    chunks
}

fn push_chunk(text: &str, window: &[Piece], chunks: &mut Vec<Chunk>) {
    let (Some(head), Some(tail)) = (window.first(), window.last()) else {
        return;
    };
    chunks.push(Chunk::new(
        &text[head.start..tail.end],
        chunks.len(),
        head.start,
    ));
}
