//! HTTP API for the chat backend

mod handlers;
mod sse;
mod types;

pub use handlers::{create_router, AppError};
pub(crate) use handlers::{create_session, get_session};
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::llm::ChatModel;
use crate::orchestrator::Orchestrator;
use crate::relay::RelayClient;
use crate::store::SessionStore;
use crate::tools::ToolRegistry;
use std::sync::Arc;

/// Application state shared across handlers.
///
/// The model and store are optional capabilities: requests that need a
/// missing one fail with a configuration error, everything else keeps
/// working.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Option<Arc<Orchestrator>>,
    pub model: Option<Arc<dyn ChatModel>>,
    pub store: Option<SessionStore>,
}

impl AppState {
    pub fn new(
        model: Option<Arc<dyn ChatModel>>,
        store: Option<SessionStore>,
        relay: Option<RelayClient>,
    ) -> Self {
        let tools = Arc::new(ToolRegistry::standard());
        let orchestrator = model.clone().map(|model| {
            Arc::new(Orchestrator::new(
                model,
                tools,
                store.clone(),
                relay,
            ))
        });

        Self {
            orchestrator,
            model,
            store,
        }
    }
}
