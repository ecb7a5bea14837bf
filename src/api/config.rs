//! Config API endpoints

use axum::{Json, extract::State as AxumState, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::{error, info};

use crate::{SharedState, reload_config};

/// POST /api/reload - Reload configuration from disk
///
/// Requests already being dispatched keep the configuration they started with.
pub async fn reload_config_endpoint(AxumState(state): AxumState<SharedState>) -> impl IntoResponse {
    match reload_config(&state.config_path).await {
        Ok(new_config) => {
            let projects = new_config.project.len();
            state.replace_config(new_config);
            info!(
                "Configuration reloaded successfully from {:?} ({} projects)",
                state.config_path, projects
            );
            Json(json!({
                "status": "success",
                "message": "Configuration reloaded successfully",
                "projects": projects
            }))
            .into_response()
        }
        Err(e) => {
            error!("Failed to reload config: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": e.to_string()
                })),
            )
                .into_response()
        }
    }
}
