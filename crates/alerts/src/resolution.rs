//! The resolution state machine: the only writer of an alert's lifecycle.
//!
//! Alerts are `Active` until resolved, and `Resolved` forever after.
//! Resolution is idempotent: resolving an already-resolved alert succeeds
//! without effect, and reports the resolution which was recorded first.
use crate::store::{AlertStore, StoreError, WriteOutcome};
use crate::Error;
use chrono::Utc;
use models::{Id, Resolution};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    /// The alert was resolved by this call.
    Resolved(Resolution),
    /// The alert had already been resolved, by this earlier resolution.
    AlreadyResolved(Resolution),
}

impl ResolveOutcome {
    pub fn resolution(&self) -> &Resolution {
        match self {
            ResolveOutcome::Resolved(r) | ResolveOutcome::AlreadyResolved(r) => r,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, ResolveOutcome::Resolved(_))
    }
}

pub struct Resolver<S> {
    store: Arc<S>,
}

impl<S> Clone for Resolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: AlertStore> Resolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Resolve alert `id` on behalf of `actor`, recording `action` as the
    /// resolution action. The resolution is written as a single conditional
    /// write, so at most one of any concurrent calls is applied.
    #[tracing::instrument(skip(self), err(level = tracing::Level::WARN))]
    pub async fn resolve(&self, id: Id, actor: &str, action: &str) -> Result<ResolveOutcome, Error> {
        let (actor, action) = (actor.trim(), action.trim());
        if actor.is_empty() {
            return Err(Error::InvalidResolution {
                alert: id,
                reason: "an actor is required",
            });
        }
        if action.is_empty() {
            return Err(Error::InvalidResolution {
                alert: id,
                reason: "a resolution action is required",
            });
        }

        let resolution = Resolution {
            resolved_by: actor.to_string(),
            resolved_at: Utc::now(),
            resolution_action: action.to_string(),
        };

        match self.store.write_resolution(id, resolution.clone()).await {
            Ok(WriteOutcome::Applied) => {
                tracing::info!(%id, %actor, %action, "resolved alert");
                Ok(ResolveOutcome::Resolved(resolution))
            }
            Ok(WriteOutcome::AlreadyResolved(existing)) => {
                tracing::debug!(
                    %id,
                    resolved_by = %existing.resolved_by,
                    resolution_action = %existing.resolution_action,
                    "alert was already resolved"
                );
                Ok(ResolveOutcome::AlreadyResolved(existing))
            }
            Err(StoreError::NotFound(id)) => Err(Error::NotFound(id)),
            Err(err) => Err(err.into()),
        }
    }
}
