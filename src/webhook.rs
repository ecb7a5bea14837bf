//! Authentication of push deliveries
//!
//! GitLab sends the configured secret verbatim in `X-Gitlab-Token`; forges that
//! sign the body instead send `X-Hub-Signature-256`. Either is accepted.

use axum::http::HeaderMap;
use hex::decode as hex_decode;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::error;

use crate::ProjectConfig;
use crate::error::{GateError, Result};

type HmacSha256 = Hmac<Sha256>;

pub const EVENT_HEADER: &str = "X-Gitlab-Event";
pub const PUSH_HOOK_EVENT: &str = "Push Hook";
pub const TOKEN_HEADER: &str = "X-Gitlab-Token";
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// Checks the delivery against the project's secret token, if it has one
pub fn authenticate(project: &ProjectConfig, headers: &HeaderMap, body: &[u8]) -> Result<()> {
    let Some(secret) = project.secret_token.as_deref().filter(|s| !s.is_empty()) else {
        return Ok(());
    };

    if let Some(token) = header_str(headers, TOKEN_HEADER) {
        if verify_token(secret, token) {
            return Ok(());
        }
        error!("Invalid token supplied for project '{}'", project.name);
        return Err(GateError::Unauthorized("invalid token".to_string()));
    }

    if let Some(signature) = header_str(headers, SIGNATURE_HEADER) {
        if verify_signature(secret, body, signature) {
            return Ok(());
        }
        error!("Signature verification failed for project '{}'!", project.name);
        return Err(GateError::Unauthorized("invalid signature".to_string()));
    }

    error!(
        "Project '{}' requires a secret token, but no token or signature header supplied.",
        project.name
    );
    Err(GateError::Unauthorized("missing token".to_string()))
}

/// True for GitLab push hook deliveries
pub fn is_push_hook(headers: &HeaderMap) -> bool {
    header_str(headers, EVENT_HEADER) == Some(PUSH_HOOK_EVENT)
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Compares through the MAC so the comparison time does not depend on the token
fn verify_token(secret: &str, token: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(secret.as_bytes());
    let expected = mac.finalize().into_bytes();

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(token.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Verifies a `sha256=<hex>` HMAC of the body
pub fn verify_signature(secret: &str, payload: &[u8], signature_header: &str) -> bool {
    let Some(hex_signature) = signature_header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(signature) = hex_decode(hex_signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&signature).is_ok()
}
