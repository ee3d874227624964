//! End-to-end tests: corpus on disk, knowledge base, generation and the HTTP API.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use scriptor_core::{Assistant, AskService, QueryResponse, StructuredGenerator};
use scriptor_gateway::{AppState, build_router};
use scriptor_llm::mock::MockProvider;
use scriptor_llm::openai::OpenAiProvider;
use scriptor_memory::KnowledgeBaseConfig;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ATTENTION: &str = r"\documentclass{article}
% preamble comment that must not be indexed
\title{Attention}
\begin{document}
\section{Model}
Self attention relates every position of a sequence to every other position.
Multi head attention runs several attention functions in parallel.
\end{document}";

const CONVOLUTION: &str = r"\section{Kernels}
Convolution kernels slide across image pixels and respond to local edges.";

fn write_corpus(dir: &Path) {
    std::fs::write(dir.join("attention.tex"), ATTENTION).unwrap();
    std::fs::write(dir.join("convolution.tex"), CONVOLUTION).unwrap();
}

fn kb_config(dir: &Path) -> KnowledgeBaseConfig {
    KnowledgeBaseConfig {
        pattern: dir.join("*.tex").display().to_string(),
        chunk_size: 120,
        chunk_overlap: 20,
        ..KnowledgeBaseConfig::default()
    }
}

async fn read_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn ask_request(query: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/ask-paper")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_vec(&serde_json::json!({ "query": query })).unwrap(),
        ))
        .unwrap()
}

#[tokio::test]
async fn ask_paper_over_http_with_mock_backends() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());

    let generator = MockProvider::with_responses(vec![
        r#"{"answer": "It relates all positions.", "references": ["attention, chunk 1"]}"#.into(),
    ]);
    let assistant = Assistant::new(
        StructuredGenerator::new(generator.clone(), Duration::from_secs(5)),
        Arc::new(MockProvider::default()),
        kb_config(dir.path()),
        2,
    );
    let service: Arc<dyn AskService> = Arc::new(assistant);
    let app = build_router(AppState::new(Arc::clone(&service)), 1_048_576);

    let resp = app
        .clone()
        .oneshot(ask_request("What does self attention relate?"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let json = read_json(resp).await;
    assert_eq!(json["answer"], "It relates all positions.");
    assert_eq!(json["references"], serde_json::json!(["attention, chunk 1"]));

    let prompt = &generator.recorded()[0][1].content;
    assert_eq!(prompt.matches("<chunk reference=").count(), 2);
    assert!(!prompt.contains("preamble comment"));
    assert!(!prompt.contains("\\section"));

    let health = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(read_json(health).await["knowledge_base_ready"], true);
}

#[tokio::test]
async fn empty_corpus_is_service_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let assistant = Assistant::new(
        StructuredGenerator::new(MockProvider::default(), Duration::from_secs(5)),
        Arc::new(MockProvider::default()),
        kb_config(dir.path()),
        2,
    );
    let app = build_router(AppState::new(Arc::new(assistant)), 1_048_576);

    let resp = app.oneshot(ask_request("anything")).await.unwrap();
    assert_eq!(resp.status(), 503);
    assert!(read_json(resp).await["error"].is_string());
}

/// Answers every embeddings request with one fixed-width vector per input.
fn embeddings_responder(req: &wiremock::Request) -> ResponseTemplate {
    let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
    let inputs = body["input"].as_array().unwrap();
    let data: Vec<_> = inputs
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let len = text.as_str().unwrap().len() as f32;
            serde_json::json!({ "index": i, "embedding": [1.0, len] })
        })
        .collect();
    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": data }))
}

fn openai_provider(server: &MockServer, embedding_model: Option<&str>) -> OpenAiProvider {
    OpenAiProvider::new(
        "test-key".into(),
        format!("{}/v1", server.uri()),
        "test-model".into(),
        256,
        embedding_model.map(str::to_owned),
    )
}

#[tokio::test]
async fn openai_compatible_backend_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(embeddings_responder)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": "```json\n{\"answer\": \"Kernels detect edges.\", \"references\": [\"convolution, chunk 1\"]}\n```"
            }}]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let assistant = Assistant::new(
        StructuredGenerator::new(openai_provider(&server, None), Duration::from_secs(5)),
        Arc::new(openai_provider(&server, Some("test-embed")).with_embedding_batch_size(2)),
        kb_config(dir.path()),
        3,
    );

    let response = assistant.ask("What do kernels detect?").await.unwrap();
    assert_eq!(
        response,
        QueryResponse::new("Kernels detect edges.", vec!["convolution, chunk 1".into()])
    );
}

#[tokio::test]
async fn unreachable_generation_backend_is_reported_in_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(embeddings_responder)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let assistant = Assistant::new(
        StructuredGenerator::new(openai_provider(&server, None), Duration::from_secs(5)),
        Arc::new(openai_provider(&server, Some("test-embed"))),
        kb_config(dir.path()),
        3,
    );

    let response = assistant.ask("What do kernels detect?").await.unwrap();
    assert!(response.answer.starts_with("LLM error"));
    assert!(response.references.is_empty());
}

#[test]
fn shipped_config_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default.toml");
    let content = std::fs::read_to_string(path).unwrap();
    let config: scriptor_core::Config = toml::from_str(&content).unwrap();
    config.validate().unwrap();
    assert_eq!(config.embedding.batch_size, 64);
    assert_eq!(config.llm.structured_output, scriptor_core::config::StructuredOutput::JsonObject);
}
