//! Push hook payload model and normalization
//!
//! Field names follow the GitLab push hook JSON (`git_http_url`,
//! `total_commits_count`, ...). Everything except the commit list is optional
//! because older and third-party senders omit large parts of the payload.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};
use url::Url;

/// A push notification describing commits pushed to a single ref
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PushEvent {
    #[serde(rename = "ref", default)]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub project: Option<Project>,
    #[serde(default)]
    pub repository: Option<Repository>,
    /// Chronological push order, oldest first
    #[serde(default)]
    pub commits: Option<Vec<Commit>>,
    #[serde(default)]
    pub total_commits_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Repository {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, alias = "http_url")]
    pub git_http_url: Option<String>,
    #[serde(default)]
    pub git_ssh_url: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Project {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path_with_namespace: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Commit {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: Author,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Author {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Senders write `null` for a missing message or author; treat it like an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Why a namespace could not be derived from the repository http url
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamespaceError {
    #[error("Invalid repository url found while building namespace: {0}")]
    MalformedRepositoryUrl(String),

    #[error("Could not find suitable namespace in {0}")]
    BlankDerivedPath(String),
}

impl PushEvent {
    /// Parse a raw push hook body
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Fills in `project` from the repository http url when the sender left it out.
    ///
    /// Never fails: an unusable url only produces a warning and the event keeps
    /// going without project information. Running it twice is a no-op.
    pub fn normalize(mut self) -> Self {
        if self.project.is_some() {
            return self;
        }
        let Some(repository) = &self.repository else {
            return self;
        };

        match derive_namespace(repository.git_http_url.as_deref()) {
            Ok(namespace) => {
                debug!("Derived project namespace '{}' from repository url", namespace);
                self.project = Some(Project {
                    namespace,
                    ..Project::default()
                });
            }
            Err(e) => warn!("{}", e),
        }
        self
    }

    /// The most recent commit of the push, if any
    pub fn latest_commit(&self) -> Option<&Commit> {
        self.commits.as_deref().and_then(|commits| commits.last())
    }

    /// Branch name of the pushed ref with `refs/heads/` removed
    pub fn branch(&self) -> Option<&str> {
        self.git_ref
            .as_deref()
            .map(|r| r.strip_prefix("refs/heads/").unwrap_or(r))
    }

    /// True when a repository block was sent without its `url`
    pub fn is_missing_repository_url(&self) -> bool {
        self.repository
            .as_ref()
            .map(|r| r.url.as_deref().map(str::is_empty).unwrap_or(true))
            .unwrap_or(false)
    }
}

/// Strips the leading `/` of the url path and keeps everything before the last
/// remaining `/`. `https://host/group/sub/app.git` gives `group/sub`, while a
/// single-segment path gives the empty namespace.
pub fn derive_namespace(http_url: Option<&str>) -> Result<String, NamespaceError> {
    let raw = http_url.unwrap_or_default();
    let url = Url::parse(raw).map_err(|_| NamespaceError::MalformedRepositoryUrl(raw.to_string()))?;

    let path = url.path();
    if path.trim().is_empty() || path == "/" {
        return Err(NamespaceError::BlankDerivedPath(raw.to_string()));
    }

    let stripped = path.strip_prefix('/').unwrap_or(path);
    let namespace = match stripped.rfind('/') {
        Some(idx) => &stripped[..idx],
        None => "",
    };
    Ok(namespace.to_string())
}
