use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use scriptor_llm::LlmProvider;
use scriptor_memory::{KnowledgeBase, KnowledgeBaseConfig, MemoryError};
use tokio::sync::OnceCell;

use crate::generation::StructuredGenerator;
use crate::prompt::build_prompt;
use crate::types::QueryResponse;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The only failure that escapes a query: the knowledge base could not be built.
#[derive(Debug, thiserror::Error)]
pub enum AskError {
    #[error("knowledge base unavailable: {0}")]
    KnowledgeBase(#[from] MemoryError),
}

/// Object-safe question answering entry point, shared by the HTTP layer.
pub trait AskService: Send + Sync {
    fn ask<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<QueryResponse, AskError>>;

    /// Whether the knowledge base has been built.
    fn is_ready(&self) -> bool;
}

/// Retrieval-augmented question answering over one corpus.
///
/// The knowledge base is built at most once: the first caller builds it while
/// concurrent callers wait for the same result. A failed build leaves nothing
/// behind, so a later call tries again.
pub struct Assistant<P, E> {
    generator: StructuredGenerator<P>,
    embedder: Arc<E>,
    kb_config: KnowledgeBaseConfig,
    top_k: usize,
    knowledge_base: OnceCell<KnowledgeBase<E>>,
}

impl<P: LlmProvider, E: LlmProvider> Assistant<P, E> {
    #[must_use]
    pub fn new(
        generator: StructuredGenerator<P>,
        embedder: Arc<E>,
        kb_config: KnowledgeBaseConfig,
        top_k: usize,
    ) -> Self {
        Self {
            generator,
            embedder,
            kb_config,
            top_k,
            knowledge_base: OnceCell::new(),
        }
    }

    /// Get the knowledge base, building it on first use.
    ///
    /// # Errors
    ///
    /// Returns the build error; the next call retries the build.
    pub async fn knowledge_base(&self) -> Result<&KnowledgeBase<E>, MemoryError> {
        self.knowledge_base
            .get_or_try_init(|| async {
                tracing::info!(pattern = %self.kb_config.pattern, "building knowledge base");
                KnowledgeBase::build(&self.kb_config, Arc::clone(&self.embedder)).await
            })
            .await
    }

    /// Build the knowledge base ahead of the first query.
    ///
    /// # Errors
    ///
    /// Returns the build error.
    pub async fn warm_up(&self) -> Result<usize, MemoryError> {
        Ok(self.knowledge_base().await?.len())
    }

    /// Answer `query` from the corpus.
    ///
    /// Backend and output failures are reported inside the returned response.
    ///
    /// # Errors
    ///
    /// Returns [`AskError::KnowledgeBase`] if the knowledge base cannot be built.
    pub async fn ask(&self, query: &str) -> Result<QueryResponse, AskError> {
        let kb = self.knowledge_base().await?;

        let chunks = match kb.retrieve(query, self.top_k).await {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!("retrieval failed: {e}");
                return Ok(QueryResponse::fallback(format!("Retrieval error: {e}")));
            }
        };
        tracing::debug!(retrieved = chunks.len(), "building prompt");

        let prompt = build_prompt(query, &chunks);
        Ok(self.generator.generate(&prompt).await)
    }
}

impl<P, E> AskService for Assistant<P, E>
where
    P: LlmProvider + 'static,
    E: LlmProvider + 'static,
{
    fn ask<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<QueryResponse, AskError>> {
        Box::pin(Assistant::ask(self, query))
    }

    fn is_ready(&self) -> bool {
        self.knowledge_base.initialized()
    }
}
