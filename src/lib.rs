pub mod api;
pub mod consumer;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod identity;
pub mod job;
pub mod logging;
pub mod project;
pub mod push;
pub mod source;
pub mod webhook;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard};
use std::time::Instant;

use crate::dispatch::Dispatcher;
use crate::error::{GateError, Result};
use crate::job::JobStore;
use crate::source::{SourceMatchMode, WatchedSource};

pub const DEFAULT_MAX_JOBS: usize = 100;

#[derive(Debug, Deserialize, Clone)]
pub struct GateConfig {
    #[serde(default)]
    pub max_jobs: Option<usize>,
    #[serde(default)]
    pub source_matching: SourceMatchMode,
    #[serde(default)]
    pub project: Vec<ProjectConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProjectConfig {
    pub name: String,
    pub kind: ProjectKind,
    pub secret_token: Option<String>,
    /// Branches a trigger project builds; empty means all
    #[serde(default)]
    pub branches: Vec<String>,
    /// Sources watched by a multibranch project
    #[serde(default)]
    pub source: Vec<WatchedSource>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    /// Builds directly from the push
    Trigger,
    /// Rescans its watched sources when one of them changes
    Multibranch,
    /// Anything else, e.g. folders or views
    #[serde(other)]
    Unsupported,
}

impl GateConfig {
    pub fn find_project(&self, name: &str) -> Option<&ProjectConfig> {
        self.project.iter().find(|p| p.name == name)
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.source_matching)
    }

    pub fn max_jobs(&self) -> usize {
        self.max_jobs.unwrap_or(DEFAULT_MAX_JOBS)
    }
}

impl ProjectConfig {
    /// Returns true if a push to `branch` should queue a build
    pub fn builds_branch(&self, branch: &str) -> bool {
        self.branches.is_empty() || self.branches.iter().any(|b| b == branch)
    }
}

pub fn parse_config(config_str: &str) -> Result<GateConfig> {
    let config: GateConfig = toml::from_str(config_str)?;

    let mut seen = std::collections::HashSet::new();
    for project in &config.project {
        if !seen.insert(project.name.as_str()) {
            return Err(GateError::ConfigError(format!(
                "Duplicate project name '{}'",
                project.name
            )));
        }
    }
    Ok(config)
}

/// Load and parse the configuration file
pub fn load_config(path: &Path) -> Result<GateConfig> {
    let config_str = std::fs::read_to_string(path).map_err(|e| {
        GateError::ConfigError(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    parse_config(&config_str)
}

/// Reload the configuration file without blocking the runtime
pub async fn reload_config(path: &Path) -> Result<GateConfig> {
    let config_str = tokio::fs::read_to_string(path).await?;
    parse_config(&config_str)
}

pub struct AppState {
    pub config: RwLock<GateConfig>,
    pub config_path: PathBuf,
    pub job_store: JobStore,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: GateConfig, config_path: PathBuf) -> Self {
        let job_store = JobStore::new(config.max_jobs());
        Self {
            config: RwLock::new(config),
            config_path,
            job_store,
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }

    pub fn config(&self) -> RwLockReadGuard<'_, GateConfig> {
        self.config.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Swap in a freshly loaded configuration
    pub fn replace_config(&self, new_config: GateConfig) {
        let mut config = self.config.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *config = new_config;
    }
}

pub type SharedState = Arc<AppState>;
