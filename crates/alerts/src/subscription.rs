//! The subscription manager maintains the live set of active alerts.
//!
//! A `Subscription` is an owned handle of a background task which drains
//! snapshots from the store. Cancelling or dropping the handle stops the task
//! and releases the store subscription. Transport failures end the feed:
//! there is no automatic retry, and callers recover through `refresh()` or
//! by subscribing again.
use crate::store::{AlertStore, SnapshotStream};
use crate::Error;
use futures::StreamExt;
use models::{Alert, Id};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Privilege gates whether a caller may observe alerts.
pub trait Privilege: Send + Sync + 'static {
    fn is_admin(&self) -> bool;
}

impl Privilege for bool {
    fn is_admin(&self) -> bool {
        *self
    }
}

/// A privilege which may be revoked (or granted) at runtime.
impl Privilege for AtomicBool {
    fn is_admin(&self) -> bool {
        self.load(Ordering::SeqCst)
    }
}

/// FeedState is the observable state of the live alert feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedState {
    /// Active alerts, most recently created first.
    pub alerts: Arc<Vec<Alert>>,
    /// True while awaiting the first snapshot of a subscription or refresh.
    pub loading: bool,
    /// Message of the last transport failure, cleared by the next snapshot.
    pub error: Option<String>,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            alerts: Arc::new(Vec::new()),
            loading: false,
            error: None,
        }
    }
}

struct Shared {
    privilege: Arc<dyn Privilege>,
    state: watch::Sender<FeedState>,
    // Ids resolved through this engine which a snapshot in flight may still
    // include. An id is pruned once a snapshot arrives without it.
    tombstones: Mutex<HashSet<Id>>,
}

impl Shared {
    fn publish(&self, mut alerts: Vec<Alert>) -> Arc<Vec<Alert>> {
        {
            let mut tombstones = self.tombstones.lock().unwrap();
            tombstones.retain(|id| alerts.iter().any(|a| a.id == *id));
            alerts.retain(|a| !a.is_resolved() && !tombstones.contains(&a.id));
        }
        alerts.sort_by(|l, r| r.created_at.cmp(&l.created_at));

        let alerts = Arc::new(alerts);
        self.state.send_replace(FeedState {
            alerts: alerts.clone(),
            loading: false,
            error: None,
        });
        alerts
    }

    fn fail(&self, message: String) {
        self.state.send_modify(|state| {
            state.loading = false;
            state.error = Some(message);
        });
    }

    fn deny(&self) {
        self.state.send_replace(FeedState::default());
    }

    fn forget(&self, id: Id) {
        self.tombstones.lock().unwrap().insert(id);
        self.state.send_if_modified(|state| {
            if !state.alerts.iter().any(|a| a.id == id) {
                return false;
            }
            state.alerts = Arc::new(
                state
                    .alerts
                    .iter()
                    .filter(|a| a.id != id)
                    .cloned()
                    .collect(),
            );
            true
        });
    }
}

pub struct SubscriptionManager<S> {
    store: Arc<S>,
    shared: Arc<Shared>,
    // Token of the current subscription. There's at most one live feed.
    current: Mutex<Option<CancellationToken>>,
}

impl<S: AlertStore> SubscriptionManager<S> {
    pub fn new(store: Arc<S>, privilege: Arc<dyn Privilege>) -> Self {
        let (state, _) = watch::channel(FeedState {
            loading: true,
            ..Default::default()
        });

        Self {
            store,
            shared: Arc::new(Shared {
                privilege,
                state,
                tombstones: Mutex::new(HashSet::new()),
            }),
            current: Mutex::new(None),
        }
    }

    /// Subscribe to the active alerts. `on_update` is called with the complete
    /// set of active alerts upon each change, and `on_error` with a message if
    /// the feed fails. A feed which has failed delivers nothing further.
    ///
    /// Subscribing replaces any current subscription of this manager.
    /// Without admin privilege, the feed is reported as empty and the
    /// returned Subscription is inert.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe<U, E>(&self, mut on_update: U, on_error: E) -> Subscription
    where
        U: FnMut(&[Alert]) + Send + 'static,
        E: FnMut(&str) + Send + 'static,
    {
        if !self.shared.privilege.is_admin() {
            tracing::debug!("alert feed requires admin privilege, reporting an empty feed");
            if let Some(previous) = self.current.lock().unwrap().take() {
                previous.cancel();
            }
            self.shared.deny();
            on_update(&[]);
            return Subscription::inert();
        }

        let token = CancellationToken::new();
        if let Some(previous) = self.current.lock().unwrap().replace(token.clone()) {
            previous.cancel();
        }
        self.shared.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let task = tokio::spawn(deliver(
            self.shared.clone(),
            self.store.subscribe_active_alerts(),
            token.clone(),
            on_update,
            on_error,
        ));
        tracing::debug!("subscribed to active alerts");

        Subscription {
            token,
            task: Some(task),
        }
    }

    /// Pull the active alerts from the store once. This is the recovery path
    /// after a subscription has failed.
    #[tracing::instrument(skip(self), err(level = tracing::Level::WARN))]
    pub async fn refresh(&self) -> Result<(), Error> {
        if !self.shared.privilege.is_admin() {
            self.shared.deny();
            return Ok(());
        }
        self.shared.state.send_modify(|state| state.loading = true);

        match self.store.query_active_alerts().await {
            Ok(alerts) => {
                let alerts = self.shared.publish(alerts);
                tracing::info!(active = alerts.len(), "refreshed active alerts");
                Ok(())
            }
            Err(err) => {
                self.shared.fail(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Current state of the feed.
    pub fn current(&self) -> FeedState {
        self.shared.state.borrow().clone()
    }

    /// Watch the state of the feed.
    pub fn watch(&self) -> watch::Receiver<FeedState> {
        self.shared.state.subscribe()
    }

    /// Remove a resolved alert from the feed without awaiting the store.
    pub(crate) fn forget(&self, id: Id) {
        self.shared.forget(id)
    }
}

async fn deliver<U, E>(
    shared: Arc<Shared>,
    mut stream: SnapshotStream,
    token: CancellationToken,
    mut on_update: U,
    mut on_error: E,
) where
    U: FnMut(&[Alert]) + Send + 'static,
    E: FnMut(&str) + Send + 'static,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            next = stream.next() => next,
        };

        let message = match next {
            Some(Ok(alerts)) => {
                if !shared.privilege.is_admin() {
                    tracing::info!("admin privilege was revoked, closing alert feed");
                    shared.deny();
                    if !token.is_cancelled() {
                        on_update(&[]);
                    }
                    break;
                }

                let alerts = shared.publish(alerts);
                tracing::debug!(active = alerts.len(), "received active alerts");

                if token.is_cancelled() {
                    break;
                }
                on_update(&alerts);
                continue;
            }
            Some(Err(err)) => err.to_string(),
            None => "alert feed closed unexpectedly".to_string(),
        };

        tracing::warn!(error = %message, "alert subscription failed");
        shared.fail(message.clone());
        if !token.is_cancelled() {
            on_error(&message);
        }
        break;
    }
    // `stream` is dropped here, releasing the store subscription.
}

/// Subscription is an owned handle of a live alert feed.
/// The feed is cancelled when the handle is cancelled or dropped.
#[must_use = "dropping a Subscription cancels it"]
pub struct Subscription {
    token: CancellationToken,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl Subscription {
    fn inert() -> Self {
        let token = CancellationToken::new();
        token.cancel();
        Self { token, task: None }
    }

    /// Cancel the subscription. No callbacks are started after this returns,
    /// though one already in progress may complete. Repeated calls are no-ops.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!("cancelling alert subscription");
        }
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns true if the feed is still delivering snapshots.
    pub fn is_live(&self) -> bool {
        !self.token.is_cancelled() && self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Wait for the feed to end, either through cancellation or failure.
    pub async fn finished(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::error!(error = %err, "alert subscription task failed");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
