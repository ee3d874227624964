//! LaTeX corpus loading, chunking and the in-memory vector knowledge base.

pub mod document;
pub mod error;
pub mod index;
pub mod knowledge_base;

pub use error::MemoryError;
pub use index::{FlatIpIndex, IndexError, SearchHit, VectorIndex};
pub use knowledge_base::{KnowledgeBase, KnowledgeBaseConfig, RetrievedChunk};
