pub mod routes;

use crate::config::Config;
use crate::dataset::FolderPicker;
use crate::error::{ConnectorError, Result};
use crate::modules::ModuleManager;
use crate::training::RunCoordinator;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared state handed to every request handler
pub struct AppState {
    pub modules: ModuleManager,
    pub coordinator: RunCoordinator,
    pub picker: Arc<dyn FolderPicker>,
}

/// Build the full application router
///
/// CORS is wide open: the connector is a localhost companion driven by a
/// web page served from another origin.
pub fn router(state: Arc<AppState>) -> Router {
    routes::routes(state).layer(CorsLayer::permissive())
}

/// Bind and serve until the process is terminated
pub async fn serve(config: &Config, state: Arc<AppState>) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ConnectorError::Other(format!("failed to bind {addr}: {e}")))?;

    tracing::info!("Listening on {addr}");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| ConnectorError::Other(e.to_string()))?;

    Ok(())
}
