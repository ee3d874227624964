use super::Config;
use crate::secret::Secret;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_openai();
        self.apply_env_overrides_scriptor();
    }

    /// Variables understood by OpenAI client libraries. Prefixed variables win.
    fn apply_env_overrides_openai(&mut self) {
        if let Ok(v) = std::env::var("OPENAI_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("OPENAI_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("OPENAI_API_KEY") {
            self.secrets.api_key = Secret::new(v);
        }
    }

    fn apply_env_overrides_scriptor(&mut self) {
        if let Ok(v) = std::env::var("SCRIPTOR_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("SCRIPTOR_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("SCRIPTOR_LLM_API_KEY") {
            self.secrets.api_key = Secret::new(v);
        }
        if let Ok(v) = std::env::var("SCRIPTOR_LLM_TIMEOUT") {
            if let Ok(secs) = v.parse::<u64>() {
                self.llm.timeout_secs = secs;
            } else {
                tracing::warn!("ignoring invalid SCRIPTOR_LLM_TIMEOUT value: {v}");
            }
        }
        if let Ok(v) = std::env::var("SCRIPTOR_EMBEDDING_BASE_URL") {
            self.embedding.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("SCRIPTOR_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("SCRIPTOR_CORPUS_PATTERN") {
            self.corpus.pattern = v;
        }
        if let Ok(v) = std::env::var("SCRIPTOR_CHUNK_SIZE") {
            if let Ok(size) = v.parse::<usize>() {
                self.corpus.chunk_size = size;
            } else {
                tracing::warn!("ignoring invalid SCRIPTOR_CHUNK_SIZE value: {v}");
            }
        }
        if let Ok(v) = std::env::var("SCRIPTOR_CHUNK_OVERLAP") {
            if let Ok(overlap) = v.parse::<usize>() {
                self.corpus.chunk_overlap = overlap;
            } else {
                tracing::warn!("ignoring invalid SCRIPTOR_CHUNK_OVERLAP value: {v}");
            }
        }
        if let Ok(v) = std::env::var("SCRIPTOR_TOP_K") {
            if let Ok(k) = v.parse::<usize>() {
                self.corpus.top_k = k;
            } else {
                tracing::warn!("ignoring invalid SCRIPTOR_TOP_K value: {v}");
            }
        }
        if let Ok(v) = std::env::var("SCRIPTOR_GATEWAY_BIND") {
            self.gateway.bind = v;
        }
        if let Ok(v) = std::env::var("SCRIPTOR_GATEWAY_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                self.gateway.port = port;
            } else {
                tracing::warn!("ignoring invalid SCRIPTOR_GATEWAY_PORT value: {v}");
            }
        }
    }
}
