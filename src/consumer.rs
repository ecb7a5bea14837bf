//! What a push can be delivered to
//!
//! A consumer advertises its capabilities instead of being inspected for its
//! concrete type. The dispatcher prefers [`DirectTrigger`] over
//! [`SourceAwareOwner`] when a consumer offers both.

use crate::identity::Identity;
use crate::push::PushEvent;
use crate::source::WatchedSource;

/// A consumer that reacts to the push event itself
pub trait DirectTrigger {
    /// Replay the push to the trigger. Failures stay inside the trigger.
    fn on_post(&self, event: &PushEvent, caller: &Identity);
}

/// A consumer that owns watched sources and wants to hear when one changed
pub trait SourceAwareOwner {
    fn sources(&self) -> &[WatchedSource];

    fn on_source_updated(&self, source: &WatchedSource, caller: &Identity);
}

pub trait Consumer {
    fn name(&self) -> &str;

    fn as_direct_trigger(&self) -> Option<&dyn DirectTrigger> {
        None
    }

    fn as_source_aware_owner(&self) -> Option<&dyn SourceAwareOwner> {
        None
    }
}
