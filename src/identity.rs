//! Caller identity and the scoped switch to the system identity
//!
//! Push deliveries are authenticated by token or signature before they reach
//! the dispatcher, so consumers are notified as [`Identity::System`] no matter
//! who made the HTTP request.

use serde::Serialize;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum Identity {
    Anonymous,
    User(String),
    /// Fixed, fully privileged identity used for webhook notifications
    System,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Anonymous => write!(f, "anonymous"),
            Identity::User(name) => write!(f, "{}", name),
            Identity::System => write!(f, "SYSTEM"),
        }
    }
}

/// The identity a single request is currently acting as
#[derive(Debug)]
pub struct IdentityContext {
    current: Mutex<Identity>,
}

impl IdentityContext {
    pub fn new(caller: Identity) -> Self {
        Self {
            current: Mutex::new(caller),
        }
    }

    pub fn current(&self) -> Identity {
        self.lock().clone()
    }

    /// Switch to `identity` until the returned guard is dropped
    pub fn impersonate(&self, identity: Identity) -> Impersonation<'_> {
        let previous = std::mem::replace(&mut *self.lock(), identity);
        debug!("Impersonating {} (was {})", self.current(), previous);
        Impersonation {
            context: self,
            previous: Some(previous),
        }
    }

    /// Run `action` as [`Identity::System`]; the caller identity is restored
    /// afterwards, also when `action` panics.
    pub fn with_elevated_identity<R>(&self, action: impl FnOnce(&Identity) -> R) -> R {
        let _guard = self.impersonate(Identity::System);
        action(&Identity::System)
    }

    fn lock(&self) -> MutexGuard<'_, Identity> {
        // The identity is a plain value, a poisoned lock still holds a usable one
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Restores the previous identity on drop
#[must_use = "the identity is restored as soon as the guard is dropped"]
pub struct Impersonation<'a> {
    context: &'a IdentityContext,
    previous: Option<Identity>,
}

impl Drop for Impersonation<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *self.context.lock() = previous;
        }
    }
}
