//! Slate server library - HTTP/WebSocket server for collaborative boards.
//!
//! The router, state wiring, and WebSocket handlers live here rather than in
//! main.rs so integration tests can build the app without spawning the
//! binary.

pub mod config;
pub mod logging;
pub mod routes;
pub mod state;
pub mod websocket;

use axum::routing::get;
use axum::Router;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the full application router over `state`.
pub fn app(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(routes::health))
        .route("/sessions", get(routes::sessions::list));

    Router::new()
        .nest("/api", api_routes)
        // Persistent-connection endpoint: /{teamId}/{boardId}?sessionId=...
        .route("/{team_id}/{board_id}", get(routes::ws::upgrade))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
