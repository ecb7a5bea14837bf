//! Watched sources and matching them against a push

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use url::Url;

use crate::filter::ExclusionRule;
use crate::push::PushEvent;

/// A repository a project observes for changes
#[derive(Debug, Clone, Deserialize)]
pub struct WatchedSource {
    #[serde(default)]
    pub kind: SourceKind,
    pub remote: String,
    #[serde(default)]
    pub ignore_on_push_notifications: bool,
    #[serde(default, rename = "exclusion")]
    pub exclusion_rules: Vec<ExclusionRule>,
}

impl WatchedSource {
    pub fn git(remote: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Git,
            remote: remote.into(),
            ignore_on_push_notifications: false,
            exclusion_rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: ExclusionRule) -> Self {
        self.exclusion_rules.push(rule);
        self
    }

    pub fn ignoring_push_notifications(mut self) -> Self {
        self.ignore_on_push_notifications = true;
        self
    }
}

/// Only plain git remotes take part in push matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Git,
    #[serde(other)]
    Unsupported,
}

/// How a source remote is compared with an incoming push
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMatchMode {
    /// Any git source with a parseable remote matches, exclusion rules do the filtering
    #[default]
    Eligible,
    /// The source remote must equal one of the push's repository urls
    RemoteUrl,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot parse git remote '{0}'")]
pub struct UriSyntaxError(pub String);

/// A git remote reduced to what identifies the repository: host and path.
///
/// Scheme, user info, port and a trailing `.git` are not part of the identity,
/// so `git@host:group/app.git` and `https://host/group/app` are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitUri {
    host: Option<String>,
    path: String,
}

impl GitUri {
    pub fn parse(remote: &str) -> Result<Self, UriSyntaxError> {
        let remote = remote.trim();
        let err = || UriSyntaxError(remote.to_string());
        if remote.is_empty() {
            return Err(err());
        }

        if remote.contains("://") {
            let url = Url::parse(remote).map_err(|_| err())?;
            let host = url.host_str().map(str::to_ascii_lowercase);
            if host.is_none() && url.scheme() != "file" {
                return Err(err());
            }
            return Ok(Self {
                host,
                path: normalize_path(url.path()).ok_or_else(err)?,
            });
        }

        if remote.starts_with('/') || has_drive_letter(remote) {
            return local(remote);
        }

        // scp-like syntax: [user@]host:path. Without a colon before the first
        // slash the remote is a relative local path such as `../shared/app.git`.
        let Some((authority, path)) = remote.split_once(':') else {
            return local(remote);
        };
        if authority.contains('/') {
            return local(remote);
        }
        if path.is_empty() {
            return Err(err());
        }
        let host = authority.rsplit('@').next().unwrap_or(authority);
        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(err());
        }
        Ok(Self {
            host: Some(host.to_ascii_lowercase()),
            path: normalize_path(path).ok_or_else(err)?,
        })
    }
}

impl fmt::Display for GitUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            Some(host) => write!(f, "{}{}", host, self.path),
            None => write!(f, "{}", self.path),
        }
    }
}

/// `C:\repos\app` or `c:/repos/app`
fn has_drive_letter(remote: &str) -> bool {
    let bytes = remote.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

/// Local paths keep whether they are absolute or relative
fn local(remote: &str) -> Result<GitUri, UriSyntaxError> {
    let unified = remote.replace('\\', "/");
    let trimmed = unified.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let trimmed = trimmed.trim_end_matches('/');
    if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
        return Err(UriSyntaxError(remote.to_string()));
    }
    Ok(GitUri {
        host: None,
        path: trimmed.to_string(),
    })
}

fn normalize_path(path: &str) -> Option<String> {
    let trimmed = path.trim_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let trimmed = trimmed.trim_end_matches('/');
    if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
        return None;
    }
    Some(format!("/{}", trimmed))
}

impl SourceMatchMode {
    /// Whether `source` should be evaluated for `event`.
    ///
    /// An unparseable source remote is an error so callers can skip the
    /// source; unparseable event urls simply never match.
    pub fn matches(self, source: &WatchedSource, event: &PushEvent) -> Result<bool, UriSyntaxError> {
        let remote = GitUri::parse(&source.remote)?;
        match self {
            SourceMatchMode::Eligible => Ok(remote == GitUri::parse(&source.remote)?),
            SourceMatchMode::RemoteUrl => {
                let Some(repository) = &event.repository else {
                    return Ok(false);
                };
                let found = [
                    repository.url.as_deref(),
                    repository.git_http_url.as_deref(),
                    repository.git_ssh_url.as_deref(),
                ]
                .into_iter()
                .flatten()
                .filter_map(|candidate| GitUri::parse(candidate).ok())
                .any(|candidate| candidate == remote);
                debug!("Source {} matches push: {}", remote, found);
                Ok(found)
            }
        }
    }
}
