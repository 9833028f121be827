//! Parley - tool-calling chat backend server
//!
//! Boots the HTTP surface over the ambient bindings: a Workers AI
//! inference endpoint, an optional KV-backed session store, and an
//! optional coordination relay. Missing optional bindings degrade the
//! matching features instead of failing startup.

use parley::api::{create_router, AppState};
use parley::llm::{AiConfig, ChatModel, LoggingModel, WorkersAiService};
use parley::relay::{RelayClient, RelayConfig};
use parley::store::{HttpKvStore, KvConfig, SessionStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};
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
    let port: u16 = std::env::var("PARLEY_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8787);

    // Inference binding
    let ai_config = AiConfig::from_env();
    let model: Option<Arc<dyn ChatModel>> = match WorkersAiService::new(&ai_config) {
        Some(service) => {
            tracing::info!(model = %ai_config.model, "Workers AI binding initialized");
            Some(Arc::new(LoggingModel::new(Arc::new(service))))
        }
        None => {
            tracing::warn!(
                "No AI endpoint configured. Set CLOUDFLARE_ACCOUNT_ID and \
                 CLOUDFLARE_API_TOKEN (or WORKERS_AI_BASE_URL)."
            );
            None
        }
    };

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

    // Coordination relay binding
    let relay = match RelayConfig::from_env() {
        Some(config) => {
            tracing::info!(base_url = %config.base_url, "Coordination relay initialized");
            Some(RelayClient::new(&config))
        }
        None => {
            tracing::warn!("No coordinator configured. Set COORDINATOR_URL to enable coordination.");
            None
        }
    };

    // Create application state
    let state = AppState::new(model, store, relay);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        // Browsers read the session id off the streaming response.
        .expose_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state).layer(cors).layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Parley server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
