//! Push hook endpoint exercised by calling the axum handlers directly.

use axum::body::{Bytes, to_bytes};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use push_hook_gate::api::jobs::JobsQuery;
use push_hook_gate::api::{
    get_job, get_jobs, get_projects, handle_push_hook, reload_config_endpoint, status, stream_jobs,
};
use push_hook_gate::job::JobCause;
use push_hook_gate::source::SourceMatchMode;
use push_hook_gate::{AppState, SharedState, parse_config};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;

const CONFIG: &str = r#"
[[project]]
name = "backend"
kind = "trigger"
secret_token = "s3cret"
branches = ["main"]

[[project]]
name = "apps"
kind = "multibranch"

[[project.source]]
remote = "https://gitlab.example.com/group/app.git"

[[project.source.exclusion]]
type = "user"
users = ["ci-bot"]

[[project.source]]
kind = "svn"
remote = "svn://svn.example.com/app"

[[project]]
name = "everything"
kind = "view"
"#;

const PUSH: &str = r#"{
    "object_kind": "push",
    "ref": "refs/heads/main",
    "after": "c2",
    "repository": {
        "name": "app",
        "url": "git@gitlab.example.com:group/app.git",
        "git_http_url": "https://gitlab.example.com/group/app.git"
    },
    "commits": [
        {"id": "c1", "message": "initial", "author": {"name": "alice"}},
        {"id": "c2", "message": "fix", "author": {"name": "carol"}}
    ]
}"#;

fn state() -> SharedState {
    let config = parse_config(CONFIG).unwrap();
    Arc::new(AppState::new(config, PathBuf::from("unused.toml")))
}

fn push_headers(token: Option<&'static str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("X-Gitlab-Event", HeaderValue::from_static("Push Hook"));
    if let Some(token) = token {
        headers.insert("X-Gitlab-Token", HeaderValue::from_static(token));
    }
    headers
}

async fn post(state: &SharedState, project: &str, headers: HeaderMap, body: &str) -> Response {
    handle_push_hook(
        State(state.clone()),
        Path(project.to_string()),
        headers,
        Bytes::from(body.to_string()),
    )
    .await
}

async fn json_body(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn trigger_project_queues_a_job() {
    let state = state();
    let response = post(&state, "backend", push_headers(Some("s3cret")), PUSH).await;
    assert_eq!(response.status(), StatusCode::OK);

    let jobs = state.job_store.get_jobs_by_project("backend", 10);
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].cause, JobCause::Push);
    assert_eq!(jobs[0].commit_sha.as_deref(), Some("c2"));
    assert_eq!(jobs[0].commit_author.as_deref(), Some("carol"));
}

#[tokio::test]
async fn wrong_token_is_unauthorized() {
    let state = state();
    let response = post(&state, "backend", push_headers(Some("nope")), PUSH).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post(&state, "backend", push_headers(None), PUSH).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(state.job_store.count(), 0);
}

#[tokio::test]
async fn multibranch_project_reports_each_source() {
    let state = state();
    let response = post(&state, "apps", push_headers(None), PUSH).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let sources = body["report"]["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0]["verdict"]["verdict"], "notified");
    assert_eq!(sources[1]["verdict"]["verdict"], "unsupported_kind");

    let jobs = state.job_store.get_jobs_by_project("apps", 10);
    assert_eq!(jobs.len(), 1);
    assert_eq!(
        jobs[0].cause,
        JobCause::SourceUpdated {
            remote: "https://gitlab.example.com/group/app.git".into()
        }
    );
}

#[tokio::test]
async fn excluded_author_queues_nothing() {
    let state = state();
    let body = PUSH.replace("carol", "ci-bot");
    let response = post(&state, "apps", push_headers(None), &body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["report"]["sources"][0]["verdict"]["suppression"]["reason"], "excluded_author");
    assert_eq!(state.job_store.count(), 0);
}

#[tokio::test]
async fn unsupported_project_is_a_conflict() {
    let state = state();
    let response = post(&state, "everything", push_headers(None), PUSH).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = json_body(response).await;
    assert_eq!(body["error"], "Push Hook is not supported for this project");
}

#[tokio::test]
async fn missing_repository_url_is_no_content() {
    let state = state();
    let body = PUSH.replace(r#""url": "git@gitlab.example.com:group/app.git","#, "");
    let response = post(&state, "apps", push_headers(None), &body).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(state.job_store.count(), 0);
}

#[tokio::test]
async fn other_events_and_bad_requests() {
    let state = state();

    let mut headers = HeaderMap::new();
    headers.insert("X-Gitlab-Event", HeaderValue::from_static("Merge Request Hook"));
    let response = post(&state, "apps", headers, PUSH).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = post(&state, "unknown", push_headers(None), PUSH).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post(&state, "apps", push_headers(None), "{not json").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn jobs_endpoint_lists_newest_first() {
    let state = state();
    post(&state, "backend", push_headers(Some("s3cret")), PUSH).await;
    post(&state, "apps", push_headers(None), PUSH).await;

    let response = get_jobs(
        State(state.clone()),
        Query(JobsQuery {
            project: None,
            branch: None,
            limit: Some(10),
        }),
    )
    .await
    .into_response();
    let body = json_body(response).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["jobs"][0]["project_name"], "apps");
}

#[tokio::test]
async fn reload_replaces_projects() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
        source_matching = "remote_url"

        [[project]]
        name = "fresh"
        kind = "trigger"
        "#
    )
    .unwrap();

    let config = parse_config(CONFIG).unwrap();
    let state: SharedState = Arc::new(AppState::new(config, file.path().to_path_buf()));

    let response = reload_config_endpoint(State(state.clone())).await.into_response();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(state.config().find_project("fresh").is_some());
    assert!(state.config().find_project("backend").is_none());
    assert_eq!(state.config().source_matching, SourceMatchMode::RemoteUrl);
}

#[tokio::test]
async fn null_commit_message_is_accepted() {
    let state = state();
    let body = PUSH.replace(r#""message": "fix""#, r#""message": null"#);
    let response = post(&state, "backend", push_headers(Some("s3cret")), &body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let jobs = state.job_store.get_jobs_by_project("backend", 10);
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].commit_sha.as_deref(), Some("c2"));
}

#[tokio::test]
async fn projects_endpoint_summarizes_config() {
    let state = state();
    post(&state, "apps", push_headers(None), PUSH).await;

    let body = json_body(get_projects(State(state.clone())).await.into_response()).await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["projects"][0]["name"], "backend");
    assert_eq!(body["projects"][0]["kind"], "trigger");
    assert_eq!(body["projects"][0]["secured"], true);
    assert_eq!(body["projects"][1]["kind"], "multibranch");
    assert_eq!(body["projects"][1]["sources"].as_array().unwrap().len(), 2);
    assert_eq!(body["projects"][1]["queued_jobs"], 1);
    assert_eq!(body["projects"][2]["kind"], "unsupported");
}

#[tokio::test]
async fn status_reports_job_totals() {
    let state = state();
    post(&state, "backend", push_headers(Some("s3cret")), PUSH).await;

    let body = json_body(status(State(state.clone())).await.into_response()).await;
    assert_eq!(body["server"]["name"], "push_hook_gate");
    assert_eq!(body["server"]["total_projects"], 3);
    assert_eq!(body["jobs"]["total"], 1);
    assert_eq!(body["jobs"]["recent"][0]["project_name"], "backend");
}

#[tokio::test]
async fn job_lookup_by_id() {
    let state = state();
    post(&state, "backend", push_headers(Some("s3cret")), PUSH).await;
    let id = state.job_store.get_recent_jobs(1)[0].id.clone();

    let response = get_job(State(state.clone()), Path(id.clone())).await.into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["id"], id);

    let response = get_job(State(state.clone()), Path("missing".to_string()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stream_emits_queued_jobs() {
    let state = state();
    let response = stream_jobs(State(state.clone())).await.into_response();
    let mut frames = response.into_body().into_data_stream();

    post(&state, "backend", push_headers(Some("s3cret")), PUSH).await;

    let frame = tokio::time::timeout(Duration::from_secs(5), frames.next())
        .await
        .expect("no event within timeout")
        .expect("stream ended")
        .unwrap();
    let text = String::from_utf8_lossy(&frame);
    assert!(text.contains("event: queued"));
    assert!(text.contains("backend"));
}
