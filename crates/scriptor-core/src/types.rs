use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Answer returned for every query, including failed ones.
///
/// Failures carry a human-readable description in `answer` and no references.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct QueryResponse {
    pub answer: String,
    pub references: Vec<String>,
}

impl QueryResponse {
    #[must_use]
    pub fn new(answer: impl Into<String>, references: Vec<String>) -> Self {
        Self {
            answer: answer.into(),
            references,
        }
    }

    /// A response with no references, used for reported failures.
    #[must_use]
    pub fn fallback(answer: impl Into<String>) -> Self {
        Self::new(answer, Vec::new())
    }
}
