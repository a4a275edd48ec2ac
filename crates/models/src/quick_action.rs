use serde::{Deserialize, Serialize};

use crate::ArgsObject;

/// The closed set of operations an admin may invoke directly from an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Dismiss,
    MarkContacted,
    SendReminder,
    CancelReservation,
    ExtendPickup,
    ContactUser,
    FlagUser,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Dismiss => "dismiss",
            ActionKind::MarkContacted => "mark_contacted",
            ActionKind::SendReminder => "send_reminder",
            ActionKind::CancelReservation => "cancel_reservation",
            ActionKind::ExtendPickup => "extend_pickup",
            ActionKind::ContactUser => "contact_user",
            ActionKind::FlagUser => "flag_user",
        }
    }

    pub fn all() -> &'static [ActionKind] {
        &[
            ActionKind::Dismiss,
            ActionKind::MarkContacted,
            ActionKind::SendReminder,
            ActionKind::CancelReservation,
            ActionKind::ExtendPickup,
            ActionKind::ContactUser,
            ActionKind::FlagUser,
        ]
    }

    pub fn from_name(name: &str) -> Option<ActionKind> {
        ActionKind::all()
            .iter()
            .copied()
            .find(|kind| name.eq_ignore_ascii_case(kind.name()))
    }

    /// Terminal actions resolve the alert. All others perform a side effect
    /// and leave the alert active.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionKind::Dismiss | ActionKind::MarkContacted)
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::from_name(s).ok_or_else(|| format!("invalid quick action: {s}"))
    }
}

/// A predefined action offered by an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickAction {
    /// Identifier of the action, unique within its alert.
    pub id: String,
    pub label: String,
    pub action: ActionKind,
    #[serde(default, skip_serializing_if = "ArgsObject::is_empty")]
    pub params: ArgsObject,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_terminal_actions() {
        let terminal: Vec<_> = ActionKind::all()
            .iter()
            .filter(|k| k.is_terminal())
            .map(ActionKind::name)
            .collect();
        assert_eq!(terminal, vec!["dismiss", "mark_contacted"]);
    }

    #[test]
    fn test_unknown_action_is_unrepresentable() {
        let err = serde_json::from_value::<QuickAction>(serde_json::json!({
            "id": "a1",
            "label": "Launch",
            "action": "launch_rockets",
        }))
        .unwrap_err();
        assert!(err.to_string().contains("unknown variant"), "{err}");

        assert_eq!("Send_Reminder".parse::<ActionKind>(), Ok(ActionKind::SendReminder));
    }
}
