use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rate limited")]
    RateLimited,

    #[error("authentication rejected (status {status})")]
    Unauthorized { status: u16 },

    #[error("API request failed (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("empty response from {provider}")]
    EmptyResponse { provider: String },

    #[error("embedding not supported by {provider}")]
    EmbedUnsupported { provider: String },

    #[error("expected {expected} embeddings, got {actual}")]
    EmbeddingCount { expected: usize, actual: usize },

    #[error("{0}")]
    Other(String),
}

impl LlmError {
    /// Classify a transport error, separating timeouts from other failures.
    #[must_use]
    pub fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Http(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display_in_seconds() {
        let err = LlmError::Timeout(Duration::from_secs(120));
        assert_eq!(err.to_string(), "request timed out after 120s");
    }

    #[test]
    fn unauthorized_display_includes_status() {
        let err = LlmError::Unauthorized { status: 401 };
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn embedding_count_display() {
        let err = LlmError::EmbeddingCount {
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.to_string(), "expected 3 embeddings, got 2");
    }
}
