use serde::{Deserialize, Serialize};

use crate::secret::Secret;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

fn default_corpus_pattern() -> String {
    "input/*.tex".into()
}

fn default_chunk_size() -> usize {
    800
}

fn default_chunk_overlap() -> usize {
    150
}

fn default_top_k() -> usize {
    10
}

fn default_max_file_size() -> u64 {
    scriptor_memory::document::DEFAULT_MAX_FILE_SIZE
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorpusConfig {
    #[serde(default = "default_corpus_pattern")]
    pub pattern: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            pattern: default_corpus_pattern(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            max_file_size: default_max_file_size(),
        }
    }
}

/// How the generation backend is asked to constrain its output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredOutput {
    /// `response_format: {"type": "json_object"}`.
    #[default]
    JsonObject,
    /// Strict `json_schema` generated from the response type.
    JsonSchema,
}

fn default_llm_base_url() -> String {
    "http://localhost:11434/v1".into()
}

fn default_llm_model() -> String {
    "llama3.1".into()
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_llm_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub structured_output: StructuredOutput,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            timeout_secs: default_llm_timeout(),
            structured_output: StructuredOutput::default(),
        }
    }
}

fn default_embedding_model() -> String {
    "all-minilm".into()
}

fn default_embedding_batch_size() -> usize {
    64
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Falls back to `llm.base_url` when unset.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: default_embedding_model(),
            batch_size: default_embedding_batch_size(),
        }
    }
}

fn default_gateway_bind() -> String {
    "127.0.0.1".into()
}

fn default_gateway_port() -> u16 {
    8000
}

fn default_gateway_max_body() -> usize {
    1_048_576
}

fn default_eager_build() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    #[serde(default = "default_gateway_max_body")]
    pub max_body_size: usize,
    /// Build the knowledge base before accepting requests.
    #[serde(default = "default_eager_build")]
    pub eager_build: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_gateway_bind(),
            port: default_gateway_port(),
            max_body_size: default_gateway_max_body(),
            eager_build: default_eager_build(),
        }
    }
}

/// Secrets resolved from the environment, never read from the config file.
#[derive(Debug, Clone)]
pub struct ResolvedSecrets {
    pub api_key: Secret,
}

impl Default for ResolvedSecrets {
    fn default() -> Self {
        Self {
            api_key: Secret::new("EMPTY"),
        }
    }
}
