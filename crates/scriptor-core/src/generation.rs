use std::time::Duration;

use scriptor_llm::provider::{JsonMode, Message};
use scriptor_llm::{LlmError, LlmProvider};

use crate::prompt::SYSTEM_PROMPT;
use crate::repair::parse_response;
use crate::types::QueryResponse;

const RAW_PREVIEW_CHARS: usize = 200;

/// Result of one generation attempt, before it is flattened into a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Answer(QueryResponse),
    /// Transport, authentication, rate-limit, timeout or other backend failure.
    BackendUnavailable(String),
    /// Output that is not a valid response even after repair.
    MalformedOutput(String),
}

impl GenerationOutcome {
    #[must_use]
    pub fn into_response(self) -> QueryResponse {
        match self {
            Self::Answer(response) => response,
            Self::BackendUnavailable(details) => {
                QueryResponse::fallback(format!("LLM error: {details}"))
            }
            Self::MalformedOutput(details) => {
                QueryResponse::fallback(format!("Parsing error: {details}"))
            }
        }
    }
}

/// Sends prompts to a backend in JSON mode and always yields a [`QueryResponse`].
pub struct StructuredGenerator<P> {
    provider: P,
    mode: JsonMode,
    timeout: Duration,
}

impl<P: LlmProvider> StructuredGenerator<P> {
    #[must_use]
    pub fn new(provider: P, timeout: Duration) -> Self {
        Self {
            provider,
            mode: JsonMode::Object,
            timeout,
        }
    }

    #[must_use]
    pub fn with_json_mode(mut self, mode: JsonMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Run one generation and classify the result. No retries.
    pub async fn try_generate(&self, prompt: &str) -> GenerationOutcome {
        let messages = [Message::system(SYSTEM_PROMPT), Message::user(prompt)];
        let call = self.provider.chat_json(&messages, &self.mode);

        let raw = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::warn!(provider = self.provider.name(), "generation backend failed: {e}");
                return GenerationOutcome::BackendUnavailable(e.to_string());
            }
            Err(_) => {
                let e = LlmError::Timeout(self.timeout);
                tracing::warn!(provider = self.provider.name(), "generation backend failed: {e}");
                return GenerationOutcome::BackendUnavailable(e.to_string());
            }
        };

        match parse_response(&raw) {
            Ok(response) => {
                tracing::debug!(references = response.references.len(), "structured answer parsed");
                GenerationOutcome::Answer(response)
            }
            Err(e) => {
                let preview: String = raw.chars().take(RAW_PREVIEW_CHARS).collect();
                tracing::warn!(raw = %preview, "malformed backend output: {e}");
                GenerationOutcome::MalformedOutput(e.to_string())
            }
        }
    }

    /// Generate a response; failures become fallback responses.
    pub async fn generate(&self, prompt: &str) -> QueryResponse {
        self.try_generate(prompt).await.into_response()
    }
}

#[cfg(test)]
mod tests {
    use scriptor_llm::mock::MockProvider;
    use scriptor_llm::provider::Role;

    use super::*;
    use crate::prompt::SCHEMA_EXAMPLE;

    fn generator(mock: MockProvider) -> StructuredGenerator<MockProvider> {
        StructuredGenerator::new(mock, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn valid_json_answer() {
        let mock = MockProvider::with_responses(vec![
            r#"{"answer": "Attention.", "references": ["p, chunk 1"]}"#.into(),
        ]);
        let r = generator(mock).generate("prompt").await;
        assert_eq!(r, QueryResponse::new("Attention.", vec!["p, chunk 1".into()]));
    }

    #[tokio::test]
    async fn fenced_output_is_repaired() {
        let mock = MockProvider::with_responses(vec![
            "```json\n{\"answer\": \"x\", \"references\": []}\n```".into(),
        ]);
        let r = generator(mock).generate("prompt").await;
        assert_eq!(r, QueryResponse::new("x", vec![]));
    }

    #[tokio::test]
    async fn refusal_becomes_parsing_error() {
        let mock = MockProvider::with_responses(vec!["I cannot comply.".into()]);
        let outcome = generator(mock).try_generate("prompt").await;
        assert!(matches!(outcome, GenerationOutcome::MalformedOutput(_)));

        let r = outcome.into_response();
        assert!(r.answer.starts_with("Parsing error"));
        assert!(r.references.is_empty());
    }

    #[tokio::test]
    async fn wrong_shape_becomes_parsing_error() {
        let mock = MockProvider::with_responses(vec![r#"{"result": "x"}"#.into()]);
        let r = generator(mock).generate("prompt").await;
        assert!(r.answer.starts_with("Parsing error"));
        assert!(r.references.is_empty());
    }

    #[tokio::test]
    async fn backend_failure_becomes_llm_error() {
        let r = generator(MockProvider::failing()).generate("prompt").await;
        assert!(r.answer.starts_with("LLM error"));
        assert!(r.references.is_empty());
    }

    #[tokio::test]
    async fn timeout_becomes_llm_error() {
        let mock = MockProvider::default().with_delay(500);
        let generator = StructuredGenerator::new(mock, Duration::from_millis(20));
        let outcome = generator.try_generate("prompt").await;
        assert!(matches!(outcome, GenerationOutcome::BackendUnavailable(_)));
        let r = outcome.into_response();
        assert!(r.answer.starts_with("LLM error: request timed out"));
    }

    #[tokio::test]
    async fn schema_example_round_trips() {
        let mock = MockProvider::with_responses(vec![SCHEMA_EXAMPLE.into()]);
        let r = generator(mock).generate("prompt").await;
        let expected: QueryResponse = serde_json::from_str(SCHEMA_EXAMPLE).unwrap();
        assert_eq!(r, expected);
    }

    #[tokio::test]
    async fn sends_system_then_user_message() {
        let mock = MockProvider::default();
        let generator = generator(mock);
        generator.generate("the prompt").await;

        let recorded = generator.provider().recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0][0].role, Role::System);
        assert_eq!(recorded[0][0].content, SYSTEM_PROMPT);
        assert_eq!(recorded[0][1].role, Role::User);
        assert_eq!(recorded[0][1].content, "the prompt");
    }

    #[test]
    fn outcome_fallback_strings() {
        let r = GenerationOutcome::BackendUnavailable("rate limited".into()).into_response();
        assert_eq!(r.answer, "LLM error: rate limited");
        let r = GenerationOutcome::MalformedOutput("eof".into()).into_response();
        assert_eq!(r.answer, "Parsing error: eof");
    }
}
