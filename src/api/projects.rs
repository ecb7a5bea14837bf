//! Projects API endpoints

use axum::{Json, extract::State as AxumState};
use serde::Serialize;

use crate::{ProjectKind, SharedState};

/// Summary of a configured project
#[derive(Debug, Serialize)]
pub struct ProjectSummary {
    pub name: String,
    pub kind: &'static str,
    pub branches: Vec<String>,
    pub sources: Vec<String>,
    pub secured: bool,
    pub queued_jobs: usize,
}

/// GET /api/projects - Get all projects with summaries
pub async fn get_projects(AxumState(state): AxumState<SharedState>) -> Json<serde_json::Value> {
    let summaries: Vec<ProjectSummary> = {
        let config = state.config();
        config
            .project
            .iter()
            .map(|p| ProjectSummary {
                name: p.name.clone(),
                kind: match p.kind {
                    ProjectKind::Trigger => "trigger",
                    ProjectKind::Multibranch => "multibranch",
                    ProjectKind::Unsupported => "unsupported",
                },
                branches: p.branches.clone(),
                sources: p.source.iter().map(|s| s.remote.clone()).collect(),
                secured: p.secret_token.as_deref().is_some_and(|s| !s.is_empty()),
                queued_jobs: state.job_store.get_jobs_by_project(&p.name, usize::MAX).len(),
            })
            .collect()
    };

    Json(serde_json::json!({
        "projects": summaries,
        "count": summaries.len()
    }))
}
