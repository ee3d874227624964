mod env;
mod types;


pub use types::*;

use std::path::Path;

use anyhow::Context;
use scriptor_memory::KnowledgeBaseConfig;

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Reject settings that can never produce a working pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.corpus.chunk_size == 0 {
            anyhow::bail!("corpus.chunk_size must be greater than 0");
        }
        if self.corpus.chunk_overlap >= self.corpus.chunk_size {
            anyhow::bail!(
                "corpus.chunk_overlap ({}) must be smaller than corpus.chunk_size ({})",
                self.corpus.chunk_overlap,
                self.corpus.chunk_size
            );
        }
        if self.corpus.top_k == 0 {
            anyhow::bail!("corpus.top_k must be at least 1");
        }
        if self.llm.timeout_secs == 0 {
            anyhow::bail!("llm.timeout_secs must be greater than 0");
        }
        if self.embedding.batch_size == 0 {
            anyhow::bail!("embedding.batch_size must be greater than 0");
        }
        Ok(())
    }

    #[must_use]
    pub fn knowledge_base_config(&self) -> KnowledgeBaseConfig {
        KnowledgeBaseConfig {
            pattern: self.corpus.pattern.clone(),
            chunk_size: self.corpus.chunk_size,
            chunk_overlap: self.corpus.chunk_overlap,
            max_file_size: self.corpus.max_file_size,
        }
    }

    #[must_use]
    pub fn embedding_base_url(&self) -> &str {
        self.embedding
            .base_url
            .as_deref()
            .unwrap_or(&self.llm.base_url)
    }
}
