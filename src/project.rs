//! Configured projects as push consumers
//!
//! Both pathways end in the same place: a build request in the [`JobStore`].

use tracing::info;

use crate::consumer::{Consumer, DirectTrigger, SourceAwareOwner};
use crate::identity::Identity;
use crate::job::{Job, JobCause, JobStore};
use crate::push::PushEvent;
use crate::source::WatchedSource;
use crate::{ProjectConfig, ProjectKind};

pub struct ConfiguredProject<'a> {
    config: &'a ProjectConfig,
    jobs: &'a JobStore,
}

impl<'a> ConfiguredProject<'a> {
    pub fn new(config: &'a ProjectConfig, jobs: &'a JobStore) -> Self {
        Self { config, jobs }
    }
}

impl Consumer for ConfiguredProject<'_> {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn as_direct_trigger(&self) -> Option<&dyn DirectTrigger> {
        match self.config.kind {
            ProjectKind::Trigger => Some(self),
            _ => None,
        }
    }

    fn as_source_aware_owner(&self) -> Option<&dyn SourceAwareOwner> {
        match self.config.kind {
            ProjectKind::Multibranch => Some(self),
            _ => None,
        }
    }
}

impl DirectTrigger for ConfiguredProject<'_> {
    fn on_post(&self, event: &PushEvent, caller: &Identity) {
        let branch = event.branch().unwrap_or_default();
        if !self.config.builds_branch(branch) {
            info!(
                "Push to branch '{}' does not match project '{}', skipping.",
                branch, self.config.name
            );
            return;
        }

        let job = Job::from_push(&self.config.name, event, JobCause::Push, caller);
        info!(
            "Queued job {} for project '{}' branch '{}'",
            job.id, self.config.name, branch
        );
        self.jobs.enqueue(job);
    }
}

impl SourceAwareOwner for ConfiguredProject<'_> {
    fn sources(&self) -> &[WatchedSource] {
        &self.config.source
    }

    fn on_source_updated(&self, source: &WatchedSource, caller: &Identity) {
        // The owner rescans the source, there is no push to describe
        let job = Job::from_push(
            &self.config.name,
            &PushEvent::default(),
            JobCause::SourceUpdated {
                remote: source.remote.clone(),
            },
            caller,
        );
        info!(
            "Queued job {} for project '{}' after update of {}",
            job.id, self.config.name, source.remote
        );
        self.jobs.enqueue(job);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DispatchOutcome, Dispatcher};
    use crate::identity::IdentityContext;
    use crate::push::Repository;

    fn project(kind: ProjectKind, branches: &[&str]) -> ProjectConfig {
        ProjectConfig {
            name: "app".into(),
            kind,
            secret_token: None,
            branches: branches.iter().map(|b| b.to_string()).collect(),
            source: vec![WatchedSource::git("https://gitlab.example.com/group/app.git")],
        }
    }

    fn push_to(branch: &str) -> PushEvent {
        PushEvent {
            git_ref: Some(format!("refs/heads/{}", branch)),
            repository: Some(Repository {
                url: Some("git@gitlab.example.com:group/app.git".into()),
                ..Repository::default()
            }),
            ..PushEvent::default()
        }
    }

    #[test]
    fn trigger_queues_push_for_watched_branch() {
        let jobs = JobStore::new(10);
        let config = project(ProjectKind::Trigger, &["main"]);
        let consumer = ConfiguredProject::new(&config, &jobs);
        let ctx = IdentityContext::new(Identity::Anonymous);

        let dispatcher = Dispatcher::default();
        dispatcher.dispatch(&consumer, &push_to("main"), &ctx).unwrap();
        dispatcher.dispatch(&consumer, &push_to("feature"), &ctx).unwrap();

        let queued = jobs.get_recent_jobs(10);
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].cause, JobCause::Push);
        assert_eq!(queued[0].requested_by, Identity::System);
    }

    #[test]
    fn multibranch_queues_source_update() {
        let jobs = JobStore::new(10);
        let config = project(ProjectKind::Multibranch, &[]);
        let consumer = ConfiguredProject::new(&config, &jobs);
        let ctx = IdentityContext::new(Identity::Anonymous);

        let outcome = Dispatcher::default()
            .dispatch(&consumer, &push_to("main"), &ctx)
            .unwrap();
        assert!(matches!(outcome, DispatchOutcome::Acknowledged { .. }));

        let queued = jobs.get_recent_jobs(10);
        assert_eq!(queued.len(), 1);
        assert_eq!(
            queued[0].cause,
            JobCause::SourceUpdated {
                remote: "https://gitlab.example.com/group/app.git".into()
            }
        );
    }

    #[test]
    fn other_kinds_offer_no_pathway() {
        let jobs = JobStore::new(10);
        let config = project(ProjectKind::Unsupported, &[]);
        let consumer = ConfiguredProject::new(&config, &jobs);
        assert!(consumer.as_direct_trigger().is_none());
        assert!(consumer.as_source_aware_owner().is_none());
    }
}
