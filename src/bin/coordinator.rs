//! Parley coordination service
//!
//! Standalone deployable serving the coordinate endpoint and the shared
//! session endpoints against the same KV-backed store as the chat backend.

use parley::api::AppState;
use parley::coordinator::create_coordinator_router;
use parley::store::{HttpKvStore, KvConfig, SessionStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let port: u16 = std::env::var("COORDINATOR_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8788);

    // Session store binding
    let store = match KvConfig::from_env() {
        Some(config) => {
            tracing::info!(base_url = %config.base_url, "Session store initialized");
            Some(SessionStore::new(Arc::new(HttpKvStore::new(&config))))
        }
        None => {
            tracing::warn!("No KV endpoint configured. Set KV_BASE_URL to enable sessions.");
            None
        }
    };

    // The coordinator carries no inference or relay bindings.
    let state = AppState::new(None, store, None);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_coordinator_router(state).layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Parley coordinator listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
