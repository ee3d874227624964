//! Configuration loading, prompt building, structured generation and the
//! question-answering pipeline.

pub mod config;
pub mod generation;
pub mod pipeline;
pub mod prompt;
pub mod repair;
pub mod secret;
pub mod types;

pub use config::Config;
pub use generation::{GenerationOutcome, StructuredGenerator};
pub use pipeline::{AskError, AskService, Assistant};
pub use types::{QueryRequest, QueryResponse};
