//! Dispatch of quick actions. Terminal actions resolve their alert, and all
//! other actions perform an external side effect and leave the alert active.
use crate::resolution::{ResolveOutcome, Resolver};
use crate::store::AlertStore;
use crate::Error;
use models::{ActionKind, Alert, QuickAction};
use serde::Serialize;
use std::sync::Arc;

/// External side effects of non-terminal quick actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    SendReminder,
    CancelReservation,
    ExtendPickup,
    ContactUser,
    FlagUser,
}

impl std::fmt::Display for SideEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SideEffect::SendReminder => "send a reminder",
            SideEffect::CancelReservation => "cancel the reservation",
            SideEffect::ExtendPickup => "extend the pickup window",
            SideEffect::ContactUser => "contact the user",
            SideEffect::FlagUser => "flag the user",
        })
    }
}

/// Plan of what executing a quick action does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Resolve the alert with this resolution action.
    Resolve(&'static str),
    /// Perform a side effect, leaving the alert active.
    Perform(SideEffect),
}

pub fn plan(action: ActionKind) -> Plan {
    match action {
        ActionKind::Dismiss => Plan::Resolve("dismissed"),
        ActionKind::MarkContacted => Plan::Resolve("mark_contacted"),
        ActionKind::SendReminder => Plan::Perform(SideEffect::SendReminder),
        ActionKind::CancelReservation => Plan::Perform(SideEffect::CancelReservation),
        ActionKind::ExtendPickup => Plan::Perform(SideEffect::ExtendPickup),
        ActionKind::ContactUser => Plan::Perform(SideEffect::ContactUser),
        ActionKind::FlagUser => Plan::Perform(SideEffect::FlagUser),
    }
}

/// Request to perform a side effect. Implementations take their parameters
/// from the alert's `source_data` and the action's `params`.
#[derive(Debug, Clone, Copy)]
pub struct EffectRequest<'a> {
    pub alert: &'a Alert,
    pub action: &'a QuickAction,
    pub actor: &'a str,
}

pub trait ActionEffects: Send + Sync + 'static {
    fn perform<'s>(
        &'s self,
        effect: SideEffect,
        request: EffectRequest<'s>,
    ) -> impl std::future::Future<Output = anyhow::Result<()>> + Send + 's;
}

/// ActionEffects which performs nothing, and logs each skipped side effect.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledEffects;

impl ActionEffects for DisabledEffects {
    async fn perform<'s>(
        &'s self,
        effect: SideEffect,
        request: EffectRequest<'s>,
    ) -> anyhow::Result<()> {
        tracing::warn!(
            alert = %request.alert.id,
            action_id = %request.action.id,
            %effect,
            "skipping quick action side effect (disabled)"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The action resolved its alert (or found it already resolved).
    Resolved(ResolveOutcome),
    /// The action performed its side effect. The alert remains active.
    Performed(SideEffect),
}

pub struct Dispatcher<S, E> {
    resolver: Resolver<S>,
    effects: Arc<E>,
}

impl<S, E> Clone for Dispatcher<S, E> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
            effects: self.effects.clone(),
        }
    }
}

impl<S: AlertStore, E: ActionEffects> Dispatcher<S, E> {
    pub fn new(resolver: Resolver<S>, effects: Arc<E>) -> Self {
        Self { resolver, effects }
    }

    pub fn resolver(&self) -> &Resolver<S> {
        &self.resolver
    }

    /// Execute quick `action` of `alert` on behalf of `actor`.
    /// The action must be one offered by the alert, or the call fails
    /// without effect. Calls for the same alert are not serialized.
    #[tracing::instrument(
        skip_all,
        fields(alert = %alert.id, action_id = %action.id, action = %action.action, %actor),
        err(level = tracing::Level::WARN),
    )]
    pub async fn execute(
        &self,
        alert: &Alert,
        action: &QuickAction,
        actor: &str,
    ) -> Result<ActionOutcome, Error> {
        // The alert's own copy of the action is executed, with its parameters.
        let Some(action) = alert
            .quick_action(&action.id)
            .filter(|offered| offered.action == action.action)
        else {
            return Err(Error::UnknownAction {
                alert: alert.id,
                action_id: action.id.clone(),
                action: action.action,
            });
        };

        match plan(action.action) {
            Plan::Resolve(resolution_action) => {
                let outcome = self
                    .resolver
                    .resolve(alert.id, actor, resolution_action)
                    .await?;
                Ok(ActionOutcome::Resolved(outcome))
            }
            Plan::Perform(effect) => {
                let request = EffectRequest {
                    alert,
                    action,
                    actor,
                };
                self.effects
                    .perform(effect, request)
                    .await
                    .map_err(|source| Error::Effect {
                        alert: alert.id,
                        effect,
                        source,
                    })?;

                tracing::info!(%effect, "performed quick action");
                Ok(ActionOutcome::Performed(effect))
            }
        }
    }
}
