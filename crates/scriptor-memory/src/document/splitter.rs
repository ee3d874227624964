use super::types::{Chunk, Document};
use crate::error::MemoryError;

/// Sliding-window chunking parameters, measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitterConfig {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SplitterConfig {
    /// # Errors
    ///
    /// Returns [`MemoryError::Configuration`] unless `chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, MemoryError> {
        if chunk_overlap >= chunk_size {
            return Err(MemoryError::Configuration(format!(
                "chunk overlap ({chunk_overlap}) must be smaller than chunk size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[must_use]
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split a document into referenced chunks.
    #[must_use]
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        windows(&document.content, self.chunk_size, self.chunk_overlap)
            .into_iter()
            .enumerate()
            .map(|(i, text)| Chunk::new(&document.title, i, text.to_owned()))
            .collect()
    }
}

/// Split `text` into windows of `size` characters, consecutive windows sharing
/// `overlap` characters. The last window ends at the end of the text and may be
/// shorter than `size`.
///
/// # Errors
///
/// Returns [`MemoryError::Configuration`] unless `overlap < size`.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>, MemoryError> {
    let config = SplitterConfig::new(size, overlap)?;
    Ok(windows(text, config.chunk_size, config.chunk_overlap)
        .into_iter()
        .map(str::to_owned)
        .collect())
}

fn windows(text: &str, size: usize, overlap: usize) -> Vec<&str> {
    // Byte offset of every char boundary, including the end of the text.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = bounds.len() - 1;
    if len == 0 {
        return Vec::new();
    }

    let step = size - overlap;
    let mut out = Vec::with_capacity(len.div_ceil(step));
    let mut start = 0;
    loop {
        let end = (start + size).min(len);
        out.push(&text[bounds[start]..bounds[end]]);
        if end == len {
            break;
        }
        start += step;
    }
    out
}
