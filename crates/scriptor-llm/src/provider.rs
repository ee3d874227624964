use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// How strictly the backend is asked to emit JSON.
#[derive(Clone, Debug, PartialEq)]
pub enum JsonMode {
    /// Any syntactically valid JSON object.
    Object,
    /// A JSON object validated by the backend against `schema`.
    Schema {
        name: String,
        schema: serde_json::Value,
    },
}

impl JsonMode {
    /// Build a strict schema mode from a Rust type.
    ///
    /// # Errors
    ///
    /// Returns an error if the generated schema cannot be serialized.
    pub fn schema_for<T: schemars::JsonSchema>() -> Result<Self, LlmError> {
        let schema = schemars::schema_for!(T);
        let schema = serde_json::to_value(&schema)?;
        let name = std::any::type_name::<T>()
            .rsplit("::")
            .next()
            .unwrap_or("Output")
            .to_owned();
        Ok(Self::Schema { name, schema })
    }
}

pub trait LlmProvider: Send + Sync {
    /// Send messages to the backend and return the assistant response.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to communicate or the response is invalid.
    fn chat(&self, messages: &[Message]) -> impl Future<Output = Result<String, LlmError>> + Send;

    /// Like [`Self::chat`], but instructs the backend to emit JSON only.
    ///
    /// The raw text is returned unparsed; callers own validation.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to communicate or the response is invalid.
    fn chat_json(
        &self,
        messages: &[Message],
        mode: &JsonMode,
    ) -> impl Future<Output = Result<String, LlmError>> + Send;

    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider does not support embeddings or the request fails.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, LlmError>> + Send;

    /// Embed many texts, one vector per input in input order.
    ///
    /// # Errors
    ///
    /// Returns an error if any embedding fails.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send {
        async move {
            let mut vectors = Vec::with_capacity(texts.len());
            for text in texts {
                vectors.push(self.embed(text).await?);
            }
            Ok(vectors)
        }
    }

    fn supports_embeddings(&self) -> bool;

    fn name(&self) -> &str;
}
