//! Server state and configuration.

use crate::service::PrintService;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Application state shared across handlers.
pub struct AppState {
    pub config: ServerConfig,
    pub service: PrintService,
}

impl AppState {
    pub fn new(config: ServerConfig, service: PrintService) -> Self {
        Self { config, service }
    }
}
