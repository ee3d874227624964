//! HTTP API: `POST /ask-paper`, `GET /ping` and `GET /health`.

mod error;
mod handlers;
mod router;
mod server;

pub use error::GatewayError;
pub use router::build_router;
pub use server::{AppState, BoundGateway, GatewayServer};
