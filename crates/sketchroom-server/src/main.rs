//! Sketchroom presence relay server
//!
//! Tracks who is in which artwork room and fans out join/leave notifications.
//! No stroke or image data passes through the relay.
//!
//! ## Protocol
//!
//! Messages are JSON tagged by `type`:
//! ```json
//! { "type": "join", "room": "art-42", "user_id": "auth0|abc" }
//! { "type": "log_join_user", "user_id": "auth0|def" }
//! { "type": "disconnect_user", "user_id": "auth0|abc" }
//! ```
//! and the relay answers with `joined`, `room_created`, `user_joined`,
//! `user_left` or `error`.

mod state;
mod ws;

use axum::{Router, routing::get};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::state::AppState;

const DEFAULT_PORT: u16 = 8000;

/// Build the relay router over shared room state.
pub(crate) fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Port from `PORT`, falling back to the default when unset or invalid.
fn listen_port(value: Option<String>) -> u16 {
    match value {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Invalid PORT {:?}, using {}", raw, DEFAULT_PORT);
            DEFAULT_PORT
        }),
        None => DEFAULT_PORT,
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sketchroom_server=info,tower_http=info".into()),
        )
        .init();

    let state = Arc::new(AppState::new());
    let app = router(state);

    let port = listen_port(std::env::var("PORT").ok());
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Sketchroom presence relay listening on {}", addr);
    info!("WebSocket endpoint: ws://localhost:{}/ws", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

/// Index page
async fn index() -> &'static str {
    "Sketchroom Presence Relay - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}
