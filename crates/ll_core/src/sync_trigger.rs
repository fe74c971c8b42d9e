//! When to reconcile.
//!
//! A sync fires when an identity first becomes available in the session (or switches
//! to a different user) and on every focus regain while signed in. Anonymous sessions
//! never sync. Failures are logged and left for the next trigger; there is no backoff.

use crate::progress_store::LocalProgressStore;
use crate::sync::{sync_unsynced, SyncOutcomeV1};
use crate::sync_transport::SyncTransport;
use crate::types::Identity;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEvent {
    IdentityChanged(Option<Identity>),
    FocusGained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoIdentity,
    IdentityUnchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerDecision {
    Fire(Identity),
    Skip(SkipReason),
}

/// Firing policy without side effects.
#[derive(Debug, Clone, Default)]
pub struct TriggerPolicy {
    identity: Option<Identity>,
}

impl TriggerPolicy {
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn decide(&mut self, event: &TriggerEvent) -> TriggerDecision {
        match event {
            TriggerEvent::IdentityChanged(next) => {
                let same_user = match (&self.identity, next) {
                    (Some(current), Some(next)) => current.user_id == next.user_id,
                    _ => false,
                };
                self.identity = next.clone().filter(Identity::is_valid);
                match (&self.identity, same_user) {
                    (None, _) => TriggerDecision::Skip(SkipReason::NoIdentity),
                    (Some(_), true) => TriggerDecision::Skip(SkipReason::IdentityUnchanged),
                    (Some(identity), false) => TriggerDecision::Fire(identity.clone()),
                }
            }
            TriggerEvent::FocusGained => match &self.identity {
                Some(identity) => TriggerDecision::Fire(identity.clone()),
                None => TriggerDecision::Skip(SkipReason::NoIdentity),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Skipped(SkipReason),
    Synced(SyncOutcomeV1),
    /// Logged and otherwise swallowed; carries the error code for diagnostics.
    Failed { code: String },
}

pub struct SyncTrigger {
    policy: TriggerPolicy,
    store: Arc<LocalProgressStore>,
    transport: Arc<dyn SyncTransport>,
}

impl SyncTrigger {
    pub fn new(store: Arc<LocalProgressStore>, transport: Arc<dyn SyncTransport>) -> Self {
        Self {
            policy: TriggerPolicy::default(),
            store,
            transport,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.policy.identity()
    }

    pub fn handle(&mut self, event: TriggerEvent) -> TriggerOutcome {
        match self.policy.decide(&event) {
            TriggerDecision::Skip(reason) => {
                tracing::debug!(?event, ?reason, "sync trigger skipped");
                TriggerOutcome::Skipped(reason)
            }
            TriggerDecision::Fire(identity) => self.fire(&identity),
        }
    }

    fn fire(&self, identity: &Identity) -> TriggerOutcome {
        match sync_unsynced(&self.store, self.transport.as_ref(), identity) {
            Ok(outcome) => TriggerOutcome::Synced(outcome),
            Err(error) => {
                tracing::warn!(
                    code = %error.code,
                    retryable = error.retryable,
                    "sync failed, will retry on next trigger: {}",
                    error.message
                );
                TriggerOutcome::Failed { code: error.code }
            }
        }
    }
}
