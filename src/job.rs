use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::identity::Identity;
use crate::push::PushEvent;

/// Maximum length of a commit message stored on a job
pub const MAX_COMMIT_MSG_LEN: usize = 500;

/// Capacity of the job event broadcast channel
const JOB_EVENT_CAPACITY: usize = 64;

/// What asked for a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobCause {
    /// A direct trigger received the push
    Push,
    /// A watched source of a multibranch project changed
    SourceUpdated { remote: String },
}

/// A queued build request
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: String,
    pub project_name: String,
    pub branch: Option<String>,
    pub commit_sha: Option<String>,
    pub commit_message: Option<String>,
    pub commit_author: Option<String>,
    pub cause: JobCause,
    pub requested_by: Identity,
    pub queued_at: DateTime<Utc>,
}

impl Job {
    /// Create a job from the latest commit of a push
    pub fn from_push(project_name: &str, event: &PushEvent, cause: JobCause, requested_by: &Identity) -> Self {
        let latest = event.latest_commit();
        Self {
            id: Uuid::now_v7().to_string(),
            project_name: project_name.to_string(),
            branch: event.branch().map(String::from),
            commit_sha: latest
                .map(|c| c.id.clone())
                .or_else(|| event.after.clone()),
            commit_message: latest.map(|c| truncate_message(&c.message)),
            commit_author: latest.map(|c| c.author.name.clone()),
            cause,
            requested_by: requested_by.clone(),
            queued_at: Utc::now(),
        }
    }
}

fn truncate_message(message: &str) -> String {
    if message.len() <= MAX_COMMIT_MSG_LEN {
        return message.to_string();
    }
    let mut end = MAX_COMMIT_MSG_LEN;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated)", &message[..end])
}

/// Job event for SSE broadcasting
#[derive(Debug, Clone, Serialize)]
pub struct JobEvent {
    pub event_type: String, // queued
    pub job_id: String,
    pub project_name: String,
    pub branch: Option<String>,
    pub timestamp: String,
}

/// Bounded in-memory history of queued jobs, newest last
pub struct JobStore {
    jobs: Mutex<VecDeque<Job>>,
    max_jobs: usize,
    events: broadcast::Sender<JobEvent>,
}

impl JobStore {
    pub fn new(max_jobs: usize) -> Self {
        let (events, _) = broadcast::channel(JOB_EVENT_CAPACITY);
        Self {
            jobs: Mutex::new(VecDeque::new()),
            max_jobs: max_jobs.max(1),
            events,
        }
    }

    /// Store a job, evicting the oldest ones past capacity
    pub fn enqueue(&self, job: Job) {
        let event = JobEvent {
            event_type: "queued".to_string(),
            job_id: job.id.clone(),
            project_name: job.project_name.clone(),
            branch: job.branch.clone(),
            timestamp: job.queued_at.to_rfc3339(),
        };

        {
            let mut jobs = self.lock();
            jobs.push_back(job);
            while jobs.len() > self.max_jobs {
                if let Some(evicted) = jobs.pop_front() {
                    debug!("Evicted job {} from history", evicted.id);
                }
            }
        }

        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    pub fn get_job(&self, id: &str) -> Option<Job> {
        self.lock().iter().find(|j| j.id == id).cloned()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Most recent first
    pub fn get_recent_jobs(&self, limit: usize) -> Vec<Job> {
        self.filtered(limit, |_| true)
    }

    pub fn get_jobs_by_project(&self, project: &str, limit: usize) -> Vec<Job> {
        self.filtered(limit, |j| j.project_name == project)
    }

    pub fn get_jobs_by_branch(&self, project: &str, branch: &str, limit: usize) -> Vec<Job> {
        self.filtered(limit, |j| {
            j.project_name == project && j.branch.as_deref() == Some(branch)
        })
    }

    fn filtered(&self, limit: usize, keep: impl Fn(&Job) -> bool) -> Vec<Job> {
        self.lock()
            .iter()
            .rev()
            .filter(|j| keep(j))
            .take(limit)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Job>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
