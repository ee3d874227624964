use axum::Router;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{ask_handler, health_handler, ping_handler};
use super::server::AppState;

pub fn build_router(state: AppState, max_body_size: usize) -> Router {
    Router::new()
        .route("/ask-paper", post(ask_handler))
        .route("/ping", get(ping_handler))
        .route("/health", get(health_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(max_body_size)),
        )
        .with_state(state)
}
