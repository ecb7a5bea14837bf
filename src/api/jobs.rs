//! Jobs API endpoints

use axum::{
    Json,
    extract::{Path, Query, State as AxumState},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::SharedState;
use crate::job::Job;

/// Query parameters for job listing
#[derive(Debug, Deserialize)]
pub struct JobsQuery {
    /// Filter by project name
    pub project: Option<String>,
    /// Filter by branch, only together with project
    pub branch: Option<String>,
    /// Number of items (default: 50, max: 100)
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct JobsResponse {
    pub jobs: Vec<Job>,
    pub total: usize,
    pub limit: usize,
}

/// GET /api/jobs - Most recent queued jobs, newest first
pub async fn get_jobs(
    AxumState(state): AxumState<SharedState>,
    Query(params): Query<JobsQuery>,
) -> Json<JobsResponse> {
    let limit = params.limit.unwrap_or(50).min(100);

    let jobs = match (&params.project, &params.branch) {
        (Some(project), Some(branch)) => state.job_store.get_jobs_by_branch(project, branch, limit),
        (Some(project), None) => state.job_store.get_jobs_by_project(project, limit),
        _ => state.job_store.get_recent_jobs(limit),
    };

    Json(JobsResponse {
        total: jobs.len(),
        jobs,
        limit,
    })
}

/// GET /api/jobs/{id} - Get a specific job by ID
pub async fn get_job(
    AxumState(state): AxumState<SharedState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.job_store.get_job(&id) {
        Some(job) => Json(job).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Job not found"})),
        )
            .into_response(),
    }
}
