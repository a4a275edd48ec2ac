use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Id, QuickAction};

/// Used for alert source data and quick-action parameters.
pub type ArgsObject = std::collections::BTreeMap<String, serde_json::Value>;

/// The closed set of operational conditions which raise an admin alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    OverdueLoan,
    NewRegistration,
    ReservationConflict,
    NoShowPattern,
    DuplicateUser,
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl AlertType {
    pub fn name(&self) -> &'static str {
        match self {
            AlertType::OverdueLoan => "overdue_loan",
            AlertType::NewRegistration => "new_registration",
            AlertType::ReservationConflict => "reservation_conflict",
            AlertType::NoShowPattern => "no_show_pattern",
            AlertType::DuplicateUser => "duplicate_user",
        }
    }

    pub fn all() -> &'static [AlertType] {
        &[
            AlertType::OverdueLoan,
            AlertType::NewRegistration,
            AlertType::ReservationConflict,
            AlertType::NoShowPattern,
            AlertType::DuplicateUser,
        ]
    }

    pub fn from_name(name: &str) -> Option<AlertType> {
        AlertType::all()
            .iter()
            .copied()
            .find(|alert_type| name.eq_ignore_ascii_case(alert_type.name()))
    }
}

impl std::str::FromStr for AlertType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlertType::from_name(s).ok_or_else(|| format!("invalid alert type: {s}"))
    }
}

/// Priority of an alert. Priorities are ordered `Critical > High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    /// All priorities, in order of decreasing precedence.
    pub const ALL: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];

    /// Sort rank of the priority, where a lower rank has higher precedence.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn from_name(name: &str) -> Option<Priority> {
        Priority::ALL
            .iter()
            .copied()
            .find(|p| name.eq_ignore_ascii_case(p.name()))
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::from_name(s).ok_or_else(|| format!("invalid priority: {s}"))
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.rank().cmp(&self.rank())
    }
}

/// Lifecycle state of an alert. Alerts begin `Active` and transition to
/// `Resolved` exactly once. There is no way back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    Active,
    Resolved,
}

/// The record of an alert's resolution. Its fields are always set together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// Actor who resolved the alert.
    pub resolved_by: String,
    pub resolved_at: DateTime<Utc>,
    /// The action which resolved the alert, such as "dismissed".
    pub resolution_action: String,
}

/// An alert requiring admin attention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Id,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    /// Context of the alert, which is matched by free-text search and passed
    /// along to quick actions.
    #[serde(default)]
    pub source_data: ArgsObject,
    #[serde(default)]
    pub quick_actions: Vec<QuickAction>,
    pub created_at: DateTime<Utc>,
    /// Set exactly once, when the alert is resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

impl Alert {
    pub fn state(&self) -> AlertState {
        if self.resolution.is_some() {
            AlertState::Resolved
        } else {
            AlertState::Active
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// Returns the quick action of this alert having the given `id`.
    pub fn quick_action(&self, id: &str) -> Option<&QuickAction> {
        self.quick_actions.iter().find(|qa| qa.id == id)
    }
}
