use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::provider::{JsonMode, LlmProvider, Message};

const PROVIDER_NAME: &str = "openai";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_EMBEDDING_BATCH: usize = 64;
const ERROR_BODY_PREVIEW: usize = 512;

/// Client for any backend speaking the OpenAI chat-completions and embeddings API
/// (OpenAI itself, Ollama's `/v1`, vLLM, llama.cpp server, ...).
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
    embedding_model: Option<String>,
    embedding_batch_size: usize,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .field("embedding_model", &self.embedding_model)
            .field("embedding_batch_size", &self.embedding_batch_size)
            .finish()
    }
}

impl Clone for OpenAiProvider {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
            embedding_model: self.embedding_model.clone(),
            embedding_batch_size: self.embedding_batch_size,
        }
    }
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(
        api_key: String,
        mut base_url: String,
        model: String,
        max_tokens: u32,
        embedding_model: Option<String>,
    ) -> Self {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: crate::http::default_client(DEFAULT_TIMEOUT),
            api_key,
            base_url,
            model,
            max_tokens,
            temperature: 0.0,
            timeout: DEFAULT_TIMEOUT,
            embedding_model,
            embedding_batch_size: DEFAULT_EMBEDDING_BATCH,
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Replace the request timeout. Rebuilds the underlying HTTP client.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.client = crate::http::default_client(timeout);
        self
    }

    #[must_use]
    pub fn with_embedding_batch_size(mut self, size: usize) -> Self {
        self.embedding_batch_size = size.max(1);
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<String, LlmError> {
        let response = self
            .client
            .post(format!("{}/{endpoint}", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(e, self.timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::from_transport(e, self.timeout))?;

        check_status(status, &text)?;
        Ok(text)
    }

    async fn send_chat(
        &self,
        messages: &[Message],
        response_format: Option<ResponseFormat<'_>>,
    ) -> Result<String, LlmError> {
        let api_messages = convert_messages(messages);
        let body = ChatRequest {
            model: &self.model,
            messages: &api_messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_format,
        };

        let text = self.post("chat/completions", &body).await?;
        let resp: OpenAiChatResponse = serde_json::from_str(&text)?;

        if let Some(usage) = resp.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion usage"
            );
        }

        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::EmptyResponse {
                provider: PROVIDER_NAME.into(),
            })
    }

    async fn send_embeddings(&self, model: &str, input: &[&str]) -> Result<Vec<Vec<f32>>, LlmError> {
        let body = EmbeddingRequest { input, model };
        let text = self.post("embeddings", &body).await?;
        let resp: EmbeddingResponse = serde_json::from_str(&text)?;

        if resp.data.len() != input.len() {
            return Err(LlmError::EmbeddingCount {
                expected: input.len(),
                actual: resp.data.len(),
            });
        }

        let mut data = resp.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn embedding_model(&self) -> Result<&str, LlmError> {
        self.embedding_model
            .as_deref()
            .ok_or_else(|| LlmError::EmbedUnsupported {
                provider: PROVIDER_NAME.into(),
            })
    }
}

fn check_status(status: reqwest::StatusCode, body: &str) -> Result<(), LlmError> {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(LlmError::RateLimited);
    }
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(LlmError::Unauthorized {
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        tracing::error!("backend API error {status}: {body}");
        let message: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
        return Err(LlmError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(())
}

impl LlmProvider for OpenAiProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.send_chat(messages, None).await
    }

    async fn chat_json(&self, messages: &[Message], mode: &JsonMode) -> Result<String, LlmError> {
        self.send_chat(messages, Some(ResponseFormat::from(mode)))
            .await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let model = self.embedding_model()?;
        self.send_embeddings(model, &[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::EmptyResponse {
                provider: PROVIDER_NAME.into(),
            })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let model = self.embedding_model()?;
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.embedding_batch_size) {
            let input: Vec<&str> = batch.iter().map(String::as_str).collect();
            vectors.extend(self.send_embeddings(model, &input).await?);
            tracing::debug!(done = vectors.len(), total = texts.len(), "embedded batch");
        }
        Ok(vectors)
    }

    fn supports_embeddings(&self) -> bool {
        self.embedding_model.is_some()
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}

fn convert_messages(messages: &[Message]) -> Vec<ApiMessage<'_>> {
    messages
        .iter()
        .map(|msg| ApiMessage {
            role: msg.role.as_str(),
            content: &msg.content,
        })
        .collect()
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage<'a>],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseFormat<'a> {
    JsonObject,
    JsonSchema { json_schema: JsonSchemaFormat<'a> },
}

impl<'a> From<&'a JsonMode> for ResponseFormat<'a> {
    fn from(mode: &'a JsonMode) -> Self {
        match mode {
            JsonMode::Object => Self::JsonObject,
            JsonMode::Schema { name, schema } => Self::JsonSchema {
                json_schema: JsonSchemaFormat {
                    name,
                    schema,
                    strict: true,
                },
            },
        }
    }
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    schema: &'a serde_json::Value,
    strict: bool,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [&'a str],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}
