//! Webhook handler for push hook deliveries

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State as AxumState},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::SharedState;
use crate::dispatch::DispatchOutcome;
use crate::error::GateError;
use crate::identity::{Identity, IdentityContext};
use crate::project::ConfiguredProject;
use crate::push::PushEvent;
use crate::webhook::{authenticate, is_push_hook};

/// POST /project/{name} - Receive a push hook for one project
pub async fn handle_push_hook(
    AxumState(state): AxumState<SharedState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !is_push_hook(&headers) {
        info!("Not a push hook; Received {:?} event", headers.get("X-Gitlab-Event"));
        return StatusCode::NO_CONTENT.into_response();
    }

    // Clone what we need so the config lock is not held while dispatching
    let (project, dispatcher) = {
        let config = state.config();
        (config.find_project(&name).cloned(), config.dispatcher())
    };
    let Some(project) = project else {
        warn!("No project named '{}', skipping.", name);
        return GateError::ProjectNotFound(name).into_response();
    };

    if let Err(e) = authenticate(&project, &headers, &body) {
        return e.into_response();
    }

    let event = match PushEvent::from_json(&body) {
        Ok(event) => event,
        Err(e) => {
            info!("Could not parse push hook body: {:?}", e);
            return GateError::InvalidPayload(e.to_string()).into_response();
        }
    };
    debug!("Push for project '{}': {:#?}", name, event);

    let identity = IdentityContext::new(Identity::Anonymous);
    let consumer = ConfiguredProject::new(&project, &state.job_store);

    match dispatcher.process(&consumer, event, &identity) {
        Ok(DispatchOutcome::Acknowledged { report }) => {
            Json(json!({"status": "ok", "report": report})).into_response()
        }
        Ok(DispatchOutcome::Dropped { reason }) => {
            info!("Dropped push for project '{}': {:?}", name, reason);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => {
            error!("Push hook for project '{}' rejected: {}", name, e);
            e.into_response()
        }
    }
}
