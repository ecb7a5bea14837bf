//! Health and status endpoints

use axum::{
    Json,
    extract::{Query, State as AxumState},
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;

use crate::SharedState;
use crate::job::Job;

/// Server statistics
#[derive(Debug, Serialize)]
pub struct ServerStats {
    pub name: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub started_at: String,
    pub total_projects: usize,
}

/// Root health check endpoint
/// Supports ?format=json for detailed JSON response
pub async fn root(
    AxumState(state): AxumState<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if params.get("format").map(String::as_str) == Some("json") {
        Json(json!({
            "server": server_stats(&state),
            "status": "healthy"
        }))
        .into_response()
    } else {
        "push_hook_gate - healthy".into_response()
    }
}

/// GET /status - Server info and the latest queued jobs
pub async fn status(AxumState(state): AxumState<SharedState>) -> Json<serde_json::Value> {
    let recent: Vec<Job> = state.job_store.get_recent_jobs(10);

    Json(json!({
        "server": server_stats(&state),
        "jobs": {
            "total": state.job_store.count(),
            "recent": recent,
        }
    }))
}

fn server_stats(state: &SharedState) -> ServerStats {
    let total_projects = state.config().project.len();
    ServerStats {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        started_at: state.started_at.to_rfc3339(),
        total_projects,
    }
}
