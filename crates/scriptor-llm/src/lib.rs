//! Generation backend abstraction, embeddings, and the OpenAI-compatible provider.

pub mod embedding;
pub mod error;
pub mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod openai;
pub mod provider;

pub use error::LlmError;
pub use provider::LlmProvider;
