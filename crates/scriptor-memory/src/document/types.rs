use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A source paper after markup cleaning.
#[derive(Debug, Clone)]
pub struct Document {
    /// File name without extension, or a relative path when that collides.
    pub title: String,
    pub content: String,
    pub source: PathBuf,
}

/// Atomic unit of retrieval. `reference` is unique within one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub reference: String,
}

impl Chunk {
    #[must_use]
    pub fn new(title: &str, index: usize, text: String) -> Self {
        Self {
            text,
            reference: format!("{title}, chunk {}", index + 1),
        }
    }
}
