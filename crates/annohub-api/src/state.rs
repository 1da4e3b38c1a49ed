//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use annohub_core::config::AppConfig;
use annohub_realtime::Broker;

/// Application state passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Broadcast broker
    pub broker: Broker,
}

impl AppState {
    /// Bundle configuration and a started broker.
    pub fn new(config: AppConfig, broker: Broker) -> Self {
        Self {
            config: Arc::new(config),
            broker,
        }
    }
}
