//! Routing a push to its consumer
//!
//! The dispatcher never talks to the network; every notification is an
//! in-process call made while the request runs as the system identity.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::consumer::{Consumer, SourceAwareOwner};
use crate::error::{GateError, Result};
use crate::filter::{self, Suppression};
use crate::identity::{Identity, IdentityContext};
use crate::push::PushEvent;
use crate::source::{SourceKind, SourceMatchMode, WatchedSource};

/// What happened to a push that was not rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Acknowledged { report: DispatchReport },
    /// Silently discarded, no consumer was notified
    Dropped { reason: DropReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    MissingRepositoryUrl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "pathway", rename_all = "snake_case")]
pub enum DispatchReport {
    Triggered,
    Sources { sources: Vec<SourceReport> },
}

impl DispatchReport {
    /// Remotes of the sources whose owner was notified
    pub fn notified(&self) -> Vec<&str> {
        match self {
            DispatchReport::Triggered => Vec::new(),
            DispatchReport::Sources { sources } => sources
                .iter()
                .filter(|s| s.verdict == SourceVerdict::Notified)
                .map(|s| s.remote.as_str())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub remote: String,
    pub verdict: SourceVerdict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum SourceVerdict {
    UnsupportedKind,
    UnmatchableUri,
    NotMatched,
    Suppressed { suppression: Suppression },
    IgnoredOnPush,
    Notified,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Dispatcher {
    match_mode: SourceMatchMode,
}

impl Dispatcher {
    pub fn new(match_mode: SourceMatchMode) -> Self {
        Self { match_mode }
    }

    /// Normalize a freshly parsed push and dispatch it
    pub fn process(
        &self,
        consumer: &dyn Consumer,
        event: PushEvent,
        identity: &IdentityContext,
    ) -> Result<DispatchOutcome> {
        let event = event.normalize();
        self.dispatch(consumer, &event, identity)
    }

    /// Deliver a normalized push to `consumer`.
    ///
    /// Returns [`GateError::UnsupportedConsumer`] when the consumer can take
    /// neither pathway. Consumer failures are not reported back.
    pub fn dispatch(
        &self,
        consumer: &dyn Consumer,
        event: &PushEvent,
        identity: &IdentityContext,
    ) -> Result<DispatchOutcome> {
        if event.is_missing_repository_url() {
            warn!("No repository url found.");
            return Ok(DispatchOutcome::Dropped {
                reason: DropReason::MissingRepositoryUrl,
            });
        }

        if let Some(trigger) = consumer.as_direct_trigger() {
            identity.with_elevated_identity(|caller| trigger.on_post(event, caller));
            return Ok(DispatchOutcome::Acknowledged {
                report: DispatchReport::Triggered,
            });
        }

        if let Some(owner) = consumer.as_source_aware_owner() {
            let sources = identity
                .with_elevated_identity(|caller| self.notify_sources(consumer.name(), owner, event, caller));
            return Ok(DispatchOutcome::Acknowledged {
                report: DispatchReport::Sources { sources },
            });
        }

        Err(GateError::unsupported_consumer())
    }

    fn notify_sources(
        &self,
        owner_name: &str,
        owner: &dyn SourceAwareOwner,
        event: &PushEvent,
        caller: &Identity,
    ) -> Vec<SourceReport> {
        owner
            .sources()
            .iter()
            .map(|source| SourceReport {
                remote: source.remote.clone(),
                verdict: self.notify_source(owner_name, owner, source, event, caller),
            })
            .collect()
    }

    /// Each source is decided on its own; suppressing one never affects the next
    fn notify_source(
        &self,
        owner_name: &str,
        owner: &dyn SourceAwareOwner,
        source: &WatchedSource,
        event: &PushEvent,
        caller: &Identity,
    ) -> SourceVerdict {
        if source.kind != SourceKind::Git {
            return SourceVerdict::UnsupportedKind;
        }

        match self.match_mode.matches(source, event) {
            Ok(true) => {}
            Ok(false) => return SourceVerdict::NotMatched,
            Err(e) => {
                debug!("Skipping source: {}", e);
                return SourceVerdict::UnmatchableUri;
            }
        }

        if let Some(suppression) = filter::evaluate(event.latest_commit(), &source.exclusion_rules) {
            return SourceVerdict::Suppressed { suppression };
        }

        if source.ignore_on_push_notifications {
            debug!(
                "Ignore on push notification for project {} about changes for {}",
                owner_name, source.remote
            );
            return SourceVerdict::IgnoredOnPush;
        }

        info!(
            "Notify project {} about changes for {}",
            owner_name, source.remote
        );
        owner.on_source_updated(source, caller);
        SourceVerdict::Notified
    }
}
