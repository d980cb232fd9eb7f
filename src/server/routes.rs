use crate::modules::{module_id_for_framework, InstalledModule, ModuleDescriptor};
use crate::server::AppState;
use crate::training::{TrainingConfig, TrainingStatus};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/modules", get(list_modules))
        .route("/modules/{module_id}/download", post(download_module))
        .route("/entrenar", post(entrenar))
        .route("/training/status", get(training_status))
        .with_state(state)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Health check for the web UI's connection indicator
#[derive(Serialize)]
struct StatusResponse {
    online: bool,
    version: &'static str,
    modules: Vec<String>,
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        online: true,
        version: env!("CARGO_PKG_VERSION"),
        modules: state.modules.installed_ids().await,
    })
}

#[derive(Serialize)]
struct ModulesResponse {
    installed: HashMap<String, InstalledModule>,
    available: Vec<ModuleDescriptor>,
}

async fn list_modules(State(state): State<Arc<AppState>>) -> Json<ModulesResponse> {
    let manifest = state.modules.remote_manifest().await;

    Json(ModulesResponse {
        installed: state.modules.installed().await,
        available: manifest.modules,
    })
}

async fn download_module(
    State(state): State<Arc<AppState>>,
    Path(module_id): Path<String>,
) -> Response {
    match state.modules.install(&module_id, None).await {
        Ok(()) => Json(json!({
            "success": true,
            "message": format!("module '{module_id}' installed"),
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// Main training endpoint
///
/// Ensures the module for the requested framework is installed, asks the
/// user for the dataset folder, and starts the run in the background. The
/// response returns before training finishes; progress is polled separately.
async fn entrenar(State(state): State<Arc<AppState>>, body: String) -> Response {
    let config: TrainingConfig = match serde_json::from_str(&body) {
        Ok(config) => config,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "no configuration provided"),
    };
    if config.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "no configuration provided");
    }

    let framework = config.framework.as_deref().unwrap_or("ultralytics");
    let module_id = module_id_for_framework(framework);

    if let Err(e) = state.modules.ensure_installed(module_id).await {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": format!("module '{module_id}' not available: {e}"),
                "module_required": module_id,
                "download_failed": true,
            })),
        )
            .into_response();
    }

    let dataset = match state.picker.pick_folder().await {
        Ok(Some(path)) => path,
        Ok(None) => return error_response(StatusCode::BAD_REQUEST, "no directory selected"),
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    };

    let trainer = match state.modules.resolve_trainer(module_id) {
        Ok(trainer) => trainer,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    };

    let response = json!({
        "success": true,
        "message": "training started in the background",
        "dataset": dataset,
        "module": module_id,
        "config": config,
    });

    state.coordinator.start(trainer, config, dataset).await;

    Json(response).into_response()
}

async fn training_status(State(state): State<Arc<AppState>>) -> Json<TrainingStatus> {
    Json(state.coordinator.snapshot().await)
}
