use std::sync::Arc;
use std::time::Instant;

use scriptor_llm::LlmProvider;
use scriptor_llm::embedding::{normalize, normalized};

use crate::document::{Chunk, DEFAULT_MAX_FILE_SIZE, LatexLoader, SplitterConfig, load_corpus};
use crate::error::MemoryError;
use crate::index::{FlatIpIndex, IndexError, VectorIndex};

/// Retrieval results carry chunk text and reference only; scores are dropped.
pub type RetrievedChunk = Chunk;

#[derive(Debug, Clone)]
pub struct KnowledgeBaseConfig {
    pub pattern: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_file_size: u64,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            pattern: "input/*.tex".into(),
            chunk_size: 800,
            chunk_overlap: 150,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Immutable corpus of chunks with a parallel vector index.
///
/// Position `i` in the index is `chunks[i]`. There is no mutation API: an
/// instance exists only if every build step succeeded.
pub struct KnowledgeBase<E> {
    chunks: Vec<Chunk>,
    index: FlatIpIndex,
    embedder: Arc<E>,
}

impl<E> std::fmt::Debug for KnowledgeBase<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("chunks", &self.chunks.len())
            .field("dimension", &self.index.dimension())
            .finish_non_exhaustive()
    }
}

impl<E: LlmProvider> KnowledgeBase<E> {
    /// Load, chunk and embed the corpus, then index every chunk.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Configuration`] for an invalid chunk window or a
    /// corpus that matches no files or yields no chunks, and propagates load,
    /// embedding and index errors.
    pub async fn build(config: &KnowledgeBaseConfig, embedder: Arc<E>) -> Result<Self, MemoryError> {
        let started = Instant::now();
        let splitter = SplitterConfig::new(config.chunk_size, config.chunk_overlap)?;
        let loader = LatexLoader::new(config.max_file_size);
        let documents = load_corpus(&config.pattern, &loader).await?;

        let mut chunks = Vec::new();
        for document in &documents {
            let produced = splitter.split(document);
            if produced.is_empty() {
                tracing::warn!(title = %document.title, "document has no text after cleaning");
            }
            chunks.extend(produced);
        }
        if chunks.is_empty() {
            return Err(MemoryError::Configuration(format!(
                "corpus {:?} produced no chunks",
                config.pattern
            )));
        }
        tracing::info!(
            documents = documents.len(),
            chunks = chunks.len(),
            "corpus chunked"
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(scriptor_llm::LlmError::EmbeddingCount {
                expected: chunks.len(),
                actual: vectors.len(),
            }
            .into());
        }
        let vectors = normalized(vectors);

        let dimension = vectors.first().map_or(0, Vec::len);
        let mut index = FlatIpIndex::new(dimension)?;
        index.add(vectors)?;

        tracing::info!(
            chunks = chunks.len(),
            dimension,
            elapsed_ms = started.elapsed().as_millis(),
            "knowledge base built"
        );

        Ok(Self {
            chunks,
            index,
            embedder,
        })
    }

    /// Return up to `k` chunks most similar to `query`, best first.
    ///
    /// `k == 0` is treated as 1. A blank query returns no chunks without
    /// calling the embedder.
    ///
    /// # Errors
    ///
    /// Returns an error if the query embedding fails or has the wrong dimension.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>, MemoryError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let k = if k == 0 {
            tracing::debug!("retrieve called with k = 0, using 1");
            1
        } else {
            k
        };

        let mut vector = self.embedder.embed(query).await?;
        if vector.is_empty() {
            return Err(IndexError::EmptyVector.into());
        }
        normalize(&mut vector);

        let hits = self.index.search(&vector, k)?;
        let results: Vec<RetrievedChunk> = hits
            .iter()
            .map(|hit| self.chunks[hit.position].clone())
            .collect();
        tracing::debug!(k, returned = results.len(), "retrieved chunks");
        Ok(results)
    }
}

impl<E> KnowledgeBase<E> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }
}
