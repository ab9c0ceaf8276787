//! # HTTP Server for Receipt Printing
//!
//! JSON API over [`PrintService`] for billing front-ends that cannot link
//! the library directly.
//!
//! ## Usage
//!
//! ```bash
//! tillroll serve --listen 0.0.0.0:8080
//! ```
//!
//! ## Routes
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | GET | `/api/devices/:variant` | | `{"devices": [...]}` |
//! | POST | `/api/print` | `{document, profile}` | `{"status": "printed", "bytes", "chunks"}` |
//! | POST | `/api/preview` | `{document, width?}` | instruction list |
//!
//! Print failures map to 503 (printer not ready), 502 (write failed) and
//! 422 (unsupported transport or format).

mod handlers;
mod state;

pub use state::{AppState, ServerConfig};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::service::PrintService;

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/devices/:variant", get(handlers::devices::list))
        .route("/api/print", post(handlers::print::print))
        .route("/api/preview", post(handlers::print::preview))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use tillroll::printer::PrintSettings;
/// use tillroll::server::{serve, ServerConfig};
/// use tillroll::service::PrintService;
/// use tillroll::transport::TransportRegistry;
///
/// # async fn example() -> std::io::Result<()> {
/// let settings = PrintSettings::default();
/// let registry = TransportRegistry::detect(&settings).await;
/// let config = ServerConfig {
///     listen_addr: "0.0.0.0:8080".to_string(),
/// };
///
/// serve(config, PrintService::new(registry, settings)).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig, service: PrintService) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(
        listen = %config.listen_addr,
        transports = ?service.registry(),
        "HTTP server listening"
    );

    let app = router(Arc::new(AppState::new(config, service)));
    axum::serve(listener, app).await
}
