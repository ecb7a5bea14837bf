//! API module for all HTTP handlers

pub mod config;
pub mod jobs;
pub mod projects;
pub mod stats;
pub mod stream;
pub mod webhook;

use axum::{Router, routing};

use crate::SharedState;

// Re-export handlers
pub use config::reload_config_endpoint;
pub use jobs::{get_job, get_jobs};
pub use projects::get_projects;
pub use stats::{root, status};
pub use stream::stream_jobs;
pub use webhook::handle_push_hook;

/// All routes served by the gate
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", routing::get(root))
        .route("/status", routing::get(status))
        .route("/project/{name}", routing::post(handle_push_hook))
        .route("/api/jobs", routing::get(get_jobs))
        .route("/api/jobs/{id}", routing::get(get_job))
        .route("/api/projects", routing::get(get_projects))
        .route("/api/stream/jobs", routing::get(stream_jobs))
        .route("/api/reload", routing::post(reload_config_endpoint))
        .with_state(state)
}
