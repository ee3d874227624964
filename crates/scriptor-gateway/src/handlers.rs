use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use scriptor_core::QueryRequest;

use super::server::AppState;

#[derive(serde::Serialize)]
struct StatusResponse {
    status: &'static str,
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    knowledge_base_ready: bool,
}

#[derive(serde::Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

pub(crate) async fn ask_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Response {
    if request.query.trim().is_empty() {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "query must not be empty");
    }

    match state.service.ask(&request.query).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::error!("ask-paper failed: {e}");
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}

pub(crate) async fn ping_handler() -> impl IntoResponse {
    Json(StatusResponse { status: "ok" })
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
        knowledge_base_ready: state.service.is_ready(),
    })
}
