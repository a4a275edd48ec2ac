use crate::dispatch::SideEffect;
use crate::store::StoreError;
use models::{ActionKind, Id};

/// Error of an engine operation. Only I/O-bound operations can fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("alert {0} not found")]
    NotFound(Id),
    #[error("invalid resolution of alert {alert}: {reason}")]
    InvalidResolution { alert: Id, reason: &'static str },
    #[error("alert {alert} does not offer quick action '{action_id}' ({action})")]
    UnknownAction {
        alert: Id,
        action_id: String,
        action: ActionKind,
    },
    #[error("failed to {effect} for alert {alert}")]
    Effect {
        alert: Id,
        effect: SideEffect,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    /// Returns true if the operation may succeed if retried, as after a `refresh()`.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Store(StoreError::Unavailable(_)) | Error::Effect { .. }
        )
    }
}
