//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::ConnectionRegistry;
use crate::service::PubSubService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Broadcast hub shared by the subscribe and publish endpoints.
    pub pubsub_service: Arc<PubSubService>,
}

impl AppState {
    /// Builds state around a fresh, empty registry.
    #[must_use]
    pub fn new() -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        Self {
            pubsub_service: Arc::new(PubSubService::new(registry)),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
