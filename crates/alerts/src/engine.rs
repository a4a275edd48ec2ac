//! AlertEngine is the caller-facing facade of the alert engine, as used by a
//! dashboard or the `alertctl` CLI.
use crate::dispatch::{ActionEffects, ActionOutcome, Dispatcher};
use crate::filter::{self, AlertFilter};
use crate::grouping::{self, PriorityGroups};
use crate::resolution::{ResolveOutcome, Resolver};
use crate::stats::AlertStats;
use crate::store::AlertStore;
use crate::subscription::{FeedState, Privilege, Subscription, SubscriptionManager};
use crate::Error;
use chrono::{DateTime, Utc};
use models::{ActionKind, Alert, Id, QuickAction, UnknownPriorityPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EngineConfig {
    /// Policy for ingested records having an unrecognized priority.
    #[serde(default)]
    pub unknown_priority: UnknownPriorityPolicy,
    /// Serialize quick actions executed against the same alert.
    #[serde(default = "EngineConfig::default_serialize_actions")]
    pub serialize_actions: bool,
}

impl EngineConfig {
    fn default_serialize_actions() -> bool {
        true
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unknown_priority: UnknownPriorityPolicy::default(),
            serialize_actions: Self::default_serialize_actions(),
        }
    }
}

/// Record of an attempted quick action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionAttempt {
    pub action_id: String,
    pub action: ActionKind,
    pub actor: String,
    pub attempted_at: DateTime<Utc>,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Resolved,
    AlreadyResolved,
    Performed,
    Failed { error: String },
}

impl From<&Result<ActionOutcome, Error>> for AttemptOutcome {
    fn from(result: &Result<ActionOutcome, Error>) -> Self {
        match result {
            Ok(ActionOutcome::Resolved(ResolveOutcome::Resolved(_))) => Self::Resolved,
            Ok(ActionOutcome::Resolved(ResolveOutcome::AlreadyResolved(_))) => {
                Self::AlreadyResolved
            }
            Ok(ActionOutcome::Performed(_)) => Self::Performed,
            Err(err) => Self::Failed {
                error: error_chain(err),
            },
        }
    }
}

// Render an Error and its sources as a single line.
fn error_chain(err: &Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(next) = source {
        message = format!("{message}: {next}");
        source = next.source();
    }
    message
}

/// AlertLocks is a keyed async lock of alert ids.
/// Entries are released once no task holds or awaits them.
#[derive(Default)]
struct AlertLocks(Mutex<HashMap<Id, Weak<tokio::sync::Mutex<()>>>>);

impl AlertLocks {
    async fn lock(&self, id: Id) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.0.lock().unwrap();
            locks.retain(|_, lock| lock.strong_count() != 0);

            match locks.get(&id).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(tokio::sync::Mutex::new(()));
                    locks.insert(id, Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }
}

/// Most recent attempts retained in the history of an alert.
const MAX_ATTEMPTS: usize = 32;

pub struct AlertEngine<S, E> {
    config: EngineConfig,
    feed: SubscriptionManager<S>,
    dispatcher: Dispatcher<S, E>,
    locks: AlertLocks,
    journal: Mutex<HashMap<Id, Vec<ActionAttempt>>>,
}

impl<S: AlertStore, E: ActionEffects> AlertEngine<S, E> {
    pub fn new(
        config: EngineConfig,
        store: Arc<S>,
        effects: Arc<E>,
        privilege: Arc<dyn Privilege>,
    ) -> Self {
        Self {
            config,
            feed: SubscriptionManager::new(store.clone(), privilege),
            dispatcher: Dispatcher::new(Resolver::new(store), effects),
            locks: AlertLocks::default(),
            journal: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Subscribe to the live feed of active alerts.
    /// See `SubscriptionManager::subscribe`.
    pub fn subscribe<U, F>(&self, on_update: U, on_error: F) -> Subscription
    where
        U: FnMut(&[Alert]) + Send + 'static,
        F: FnMut(&str) + Send + 'static,
    {
        self.feed.subscribe(on_update, on_error)
    }

    /// Pull the active alerts from the store once.
    pub async fn refresh(&self) -> Result<(), Error> {
        self.feed.refresh().await
    }

    /// Current state of the live feed.
    pub fn feed(&self) -> FeedState {
        self.feed.current()
    }

    pub fn watch(&self) -> watch::Receiver<FeedState> {
        self.feed.watch()
    }

    /// Active alerts which match `filter`, in priority order.
    pub fn active_alerts(&self, filter: &AlertFilter) -> Vec<Alert> {
        let state = self.feed.current();
        let mut alerts = filter::apply(&state.alerts, filter);
        grouping::sort(&mut alerts);
        alerts
    }

    /// Active alerts which match `filter`, partitioned by priority.
    pub fn grouped_alerts(&self, filter: &AlertFilter) -> PriorityGroups {
        grouping::group_by_priority(self.active_alerts(filter))
    }

    /// Statistics of all active alerts, regardless of any filter.
    pub fn stats(&self) -> AlertStats {
        AlertStats::from_alerts(self.feed.current().alerts.iter())
    }

    /// Find an active alert by id.
    pub fn get(&self, id: Id) -> Option<Alert> {
        self.feed.current().alerts.iter().find(|a| a.id == id).cloned()
    }

    /// Resolve alert `id` on behalf of `actor`. Resolving an alert which is
    /// already resolved succeeds without effect.
    pub async fn resolve_alert(
        &self,
        id: Id,
        actor: &str,
        action: &str,
    ) -> Result<ResolveOutcome, Error> {
        let outcome = self.dispatcher.resolver().resolve(id, actor, action).await?;
        self.feed.forget(id);
        Ok(outcome)
    }

    /// Execute quick `action` of `alert` on behalf of `actor`.
    /// Actions against the same alert are serialized, unless disabled by
    /// `EngineConfig::serialize_actions`. Every attempt is journaled.
    pub async fn execute_quick_action(
        &self,
        alert: &Alert,
        action: &QuickAction,
        actor: &str,
    ) -> Result<ActionOutcome, Error> {
        let _guard = if self.config.serialize_actions {
            Some(self.locks.lock(alert.id).await)
        } else {
            None
        };

        let result = self.dispatcher.execute(alert, action, actor).await;

        if let Ok(ActionOutcome::Resolved(_)) = &result {
            self.feed.forget(alert.id);
        }
        // Actions the alert doesn't offer were never attempted.
        if !matches!(result, Err(Error::UnknownAction { .. })) {
            let attempt = ActionAttempt {
                action_id: action.id.clone(),
                action: action.action,
                actor: actor.trim().to_string(),
                attempted_at: Utc::now(),
                outcome: AttemptOutcome::from(&result),
            };
            self.record(alert.id, attempt);
        }
        result
    }

    // Histories of alerts which have left the feed are dropped, except for
    // `id` itself, so that a resolving attempt remains observable.
    fn record(&self, id: Id, attempt: ActionAttempt) {
        let active = self.feed.current().alerts;
        let mut journal = self.journal.lock().unwrap();

        journal.retain(|other, _| *other == id || active.iter().any(|a| a.id == *other));

        let history = journal.entry(id).or_default();
        history.push(attempt);
        if history.len() > MAX_ATTEMPTS {
            history.remove(0);
        }
    }

    /// Quick actions attempted against alert `id`, oldest first.
    /// At most `MAX_ATTEMPTS` are retained, and the history of an alert which
    /// is no longer active is kept only until another alert is acted upon.
    pub fn action_history(&self, id: Id) -> Vec<ActionAttempt> {
        self.journal
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }
}
