use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Corpus or chunking setup that can never succeed as configured.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file too large: {} ({size} bytes)", path.display())]
    FileTooLarge { path: PathBuf, size: u64 },

    #[error("embedding failed: {0}")]
    Embedding(#[from] scriptor_llm::LlmError),

    #[error("vector index error: {0}")]
    Index(#[from] crate::index::IndexError),
}

impl MemoryError {
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
