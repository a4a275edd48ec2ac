//! The store contract consumed by the engine, and an in-memory implementation.
use futures::stream::BoxStream;
use futures::StreamExt;
use models::{Alert, Id, Resolution};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::{BroadcastStream, WatchStream};

/// A stream of complete snapshots of the unresolved alerts.
/// Dropping the stream releases the underlying subscription.
pub type SnapshotStream = BoxStream<'static, Result<Vec<Alert>, StoreError>>;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum StoreError {
    #[error("alert store is unavailable: {0}")]
    Unavailable(String),
    #[error("alert {0} does not exist")]
    NotFound(Id),
}

/// Outcome of a conditional resolution write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The resolution was written.
    Applied,
    /// The alert was already resolved, and carries this earlier resolution.
    /// Nothing was written.
    AlreadyResolved(Resolution),
}

/// AlertStore is the persistent home of alerts.
///
/// `write_resolution` must be a conditional write guarded by the alert's
/// current resolution: of any number of concurrent writes for the same
/// alert, at most one may be `Applied`.
pub trait AlertStore: Send + Sync + 'static {
    /// Fetch all unresolved alerts, most recently created first.
    fn query_active_alerts(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Alert>, StoreError>> + Send + '_;

    /// Subscribe to snapshots of the unresolved alerts. The current snapshot
    /// is yielded first, followed by a new snapshot upon each change.
    fn subscribe_active_alerts(&self) -> SnapshotStream;

    /// Atomically record the resolution of alert `id`, if it's still active.
    fn write_resolution(
        &self,
        id: Id,
        resolution: Resolution,
    ) -> impl std::future::Future<Output = Result<WriteOutcome, StoreError>> + Send + '_;
}

/// MemoryStore is an `AlertStore` which holds alerts in memory.
/// Resolved alerts are retained, and are excluded from active snapshots.
/// It supports injecting transport failures, for use in tests and demos.
pub struct MemoryStore {
    alerts: Mutex<BTreeMap<Id, Alert>>,
    unavailable: Mutex<Option<String>>,
    feed: watch::Sender<Arc<Vec<Alert>>>,
    // Interruptions reach only subscribers which exist when they're sent.
    interrupts: broadcast::Sender<String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MemoryStore {
    pub fn new(alerts: impl IntoIterator<Item = Alert>) -> Self {
        let alerts: BTreeMap<Id, Alert> = alerts.into_iter().map(|a| (a.id, a)).collect();
        let (feed, _) = watch::channel(Arc::new(active_snapshot(&alerts)));
        let (interrupts, _) = broadcast::channel(16);

        Self {
            alerts: Mutex::new(alerts),
            unavailable: Mutex::new(None),
            feed,
            interrupts,
        }
    }

    /// Insert or replace an alert, notifying subscribers.
    pub fn insert(&self, alert: Alert) {
        let mut alerts = self.alerts.lock().unwrap();
        alerts.insert(alert.id, alert);
        self.publish(&alerts);
    }

    /// Fetch an alert by id, whether or not it's resolved.
    pub fn get(&self, id: Id) -> Option<Alert> {
        self.alerts.lock().unwrap().get(&id).cloned()
    }

    /// Total number of alerts held, including resolved alerts.
    pub fn len(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fail all subsequent queries and writes with `reason`, until `recover`
    /// is called. Does not affect current subscribers.
    pub fn set_unavailable(&self, reason: impl Into<String>) {
        *self.unavailable.lock().unwrap() = Some(reason.into());
    }

    /// Deliver a transport failure to all current subscribers.
    /// Later subscriptions are unaffected.
    pub fn interrupt_subscribers(&self, reason: impl Into<String>) {
        // Sending fails only if there are no subscribers.
        let _ = self.interrupts.send(reason.into());
    }

    /// Clear an injected unavailability and re-publish the current snapshot.
    pub fn recover(&self) {
        *self.unavailable.lock().unwrap() = None;
        let alerts = self.alerts.lock().unwrap();
        self.publish(&alerts);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        match &*self.unavailable.lock().unwrap() {
            Some(reason) => Err(StoreError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn publish(&self, alerts: &BTreeMap<Id, Alert>) {
        self.feed.send_replace(Arc::new(active_snapshot(alerts)));
    }
}

impl AlertStore for MemoryStore {
    async fn query_active_alerts(&self) -> Result<Vec<Alert>, StoreError> {
        self.check_available()?;
        Ok(active_snapshot(&self.alerts.lock().unwrap()))
    }

    fn subscribe_active_alerts(&self) -> SnapshotStream {
        let snapshots = WatchStream::new(self.feed.subscribe())
            .map(|alerts| Ok(alerts.as_ref().clone()));
        let interrupts = BroadcastStream::new(self.interrupts.subscribe())
            .filter_map(|reason| futures::future::ready(reason.ok()))
            .map(|reason| Err(StoreError::Unavailable(reason)));

        futures::stream::select(snapshots, interrupts).boxed()
    }

    async fn write_resolution(
        &self,
        id: Id,
        resolution: Resolution,
    ) -> Result<WriteOutcome, StoreError> {
        self.check_available()?;

        let mut alerts = self.alerts.lock().unwrap();
        let alert = alerts.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if let Some(existing) = &alert.resolution {
            return Ok(WriteOutcome::AlreadyResolved(existing.clone()));
        }
        alert.resolution = Some(resolution);
        self.publish(&alerts);

        Ok(WriteOutcome::Applied)
    }
}

fn active_snapshot(alerts: &BTreeMap<Id, Alert>) -> Vec<Alert> {
    let mut active: Vec<Alert> = alerts
        .values()
        .filter(|a| !a.is_resolved())
        .cloned()
        .collect();
    active.sort_by(|l, r| r.created_at.cmp(&l.created_at));
    active
}
