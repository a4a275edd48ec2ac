use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ActionKind, Alert, AlertType, ArgsObject, Id, Priority, QuickAction, Resolution};

/// AlertRecord is the loosely-typed shape of an alert as it's written by
/// classifiers and read back from the store. Records are classified into
/// strict `Alert`s before they enter the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub id: Id,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub priority: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source_data: ArgsObject,
    #[serde(default)]
    pub quick_actions: Vec<QuickActionRecord>,
    #[serde(default)]
    pub is_resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_action: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickActionRecord {
    pub id: String,
    pub label: String,
    pub action: String,
    #[serde(default)]
    pub params: ArgsObject,
}

/// Policy for records having a priority outside of the four known values.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPriorityPolicy {
    /// Classify the alert as `Medium`.
    #[default]
    Medium,
    /// Reject the record.
    Quarantine,
}

impl std::str::FromStr for UnknownPriorityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "medium" => Ok(Self::Medium),
            "quarantine" => Ok(Self::Quarantine),
            other => Err(format!("invalid unknown-priority policy: {other}")),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RecordError {
    #[error("unknown alert type '{0}'")]
    UnknownType(String),
    #[error("unknown priority '{0}'")]
    UnknownPriority(String),
    #[error("quick action '{action_id}' has unknown action '{action}'")]
    UnknownAction { action_id: String, action: String },
    #[error("duplicate quick action id '{0}'")]
    DuplicateAction(String),
    #[error("resolution fields must be set together with isResolved")]
    PartialResolution,
}

impl AlertRecord {
    /// Classify this record into a strict `Alert`, applying `policy` to an
    /// unrecognized priority.
    pub fn into_alert(self, policy: UnknownPriorityPolicy) -> Result<Alert, RecordError> {
        let AlertRecord {
            id,
            alert_type,
            priority,
            title,
            description,
            source_data,
            quick_actions,
            is_resolved,
            resolved_by,
            resolved_at,
            resolution_action,
            created_at,
        } = self;

        let alert_type =
            AlertType::from_name(&alert_type).ok_or(RecordError::UnknownType(alert_type))?;

        let priority = match (Priority::from_name(&priority), policy) {
            (Some(priority), _) => priority,
            (None, UnknownPriorityPolicy::Medium) => Priority::Medium,
            (None, UnknownPriorityPolicy::Quarantine) => {
                return Err(RecordError::UnknownPriority(priority))
            }
        };

        let mut actions = Vec::with_capacity(quick_actions.len());
        for QuickActionRecord {
            id: action_id,
            label,
            action,
            params,
        } in quick_actions
        {
            if actions.iter().any(|qa: &QuickAction| qa.id == action_id) {
                return Err(RecordError::DuplicateAction(action_id));
            }
            let Some(kind) = ActionKind::from_name(&action) else {
                return Err(RecordError::UnknownAction { action_id, action });
            };
            actions.push(QuickAction {
                id: action_id,
                label,
                action: kind,
                params,
            });
        }

        let resolution = match (is_resolved, resolved_by, resolved_at, resolution_action) {
            (false, None, None, None) => None,
            (true, Some(resolved_by), Some(resolved_at), Some(resolution_action)) => {
                Some(Resolution {
                    resolved_by,
                    resolved_at,
                    resolution_action,
                })
            }
            _ => return Err(RecordError::PartialResolution),
        };

        Ok(Alert {
            id,
            alert_type,
            priority,
            title,
            description,
            source_data,
            quick_actions: actions,
            created_at,
            resolution,
        })
    }
}

impl From<&Alert> for AlertRecord {
    fn from(alert: &Alert) -> Self {
        let resolution = alert.resolution.clone();
        AlertRecord {
            id: alert.id,
            alert_type: alert.alert_type.name().to_string(),
            priority: alert.priority.name().to_string(),
            title: alert.title.clone(),
            description: alert.description.clone(),
            source_data: alert.source_data.clone(),
            quick_actions: alert
                .quick_actions
                .iter()
                .map(|qa| QuickActionRecord {
                    id: qa.id.clone(),
                    label: qa.label.clone(),
                    action: qa.action.name().to_string(),
                    params: qa.params.clone(),
                })
                .collect(),
            is_resolved: resolution.is_some(),
            resolved_by: resolution.as_ref().map(|r| r.resolved_by.clone()),
            resolved_at: resolution.as_ref().map(|r| r.resolved_at),
            resolution_action: resolution.map(|r| r.resolution_action),
            created_at: alert.created_at,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(patch: serde_json::Value) -> AlertRecord {
        let mut doc = serde_json::json!({
            "id": "0a",
            "type": "reservation_conflict",
            "priority": "critical",
            "title": "Conflicting reservations for Projector #4",
            "description": "Two reservations overlap on 2026-03-04",
            "sourceData": {"equipmentId": "proj-4", "reservationIds": ["r1", "r2"]},
            "quickActions": [
                {"id": "cancel", "label": "Cancel newest", "action": "cancel_reservation", "params": {"reservationId": "r2"}},
                {"id": "dismiss", "label": "Dismiss", "action": "dismiss"}
            ],
            "createdAt": "2026-03-03T08:30:00Z",
        });
        let (Some(doc), Some(patch)) = (doc.as_object_mut(), patch.as_object()) else {
            panic!("expected objects");
        };
        for (k, v) in patch {
            doc.insert(k.clone(), v.clone());
        }
        serde_json::from_value(serde_json::Value::Object(doc.clone())).unwrap()
    }

    #[test]
    fn test_record_classification() {
        let alert = record(serde_json::json!({}))
            .into_alert(UnknownPriorityPolicy::Medium)
            .unwrap();

        assert_eq!(alert.alert_type, AlertType::ReservationConflict);
        assert_eq!(alert.priority, Priority::Critical);
        assert_eq!(
            alert
                .quick_actions
                .iter()
                .map(|qa| qa.action)
                .collect::<Vec<_>>(),
            vec![ActionKind::CancelReservation, ActionKind::Dismiss]
        );
        assert!(alert.resolution.is_none());

        // Round-trips back into an equivalent record.
        let back = AlertRecord::from(&alert);
        assert_eq!(back.into_alert(UnknownPriorityPolicy::Quarantine), Ok(alert));
    }

    #[test]
    fn test_unknown_priority_policy() {
        let rec = record(serde_json::json!({"priority": "urgent"}));

        let alert = rec.clone().into_alert(UnknownPriorityPolicy::Medium).unwrap();
        assert_eq!(alert.priority, Priority::Medium);

        assert_eq!(
            rec.into_alert(UnknownPriorityPolicy::Quarantine),
            Err(RecordError::UnknownPriority("urgent".to_string()))
        );
    }

    #[test]
    fn test_rejected_records() {
        let cases = [
            (
                serde_json::json!({"type": "broken_lens"}),
                "unknown alert type 'broken_lens'",
            ),
            (
                serde_json::json!({"quickActions": [{"id": "x", "label": "X", "action": "explode"}]}),
                "quick action 'x' has unknown action 'explode'",
            ),
            (
                serde_json::json!({"quickActions": [
                    {"id": "x", "label": "X", "action": "dismiss"},
                    {"id": "x", "label": "Y", "action": "flag_user"}
                ]}),
                "duplicate quick action id 'x'",
            ),
            (
                serde_json::json!({"isResolved": true, "resolvedBy": "admin1"}),
                "resolution fields must be set together with isResolved",
            ),
            (
                serde_json::json!({"resolutionAction": "dismissed"}),
                "resolution fields must be set together with isResolved",
            ),
        ];

        for (patch, expect) in cases {
            let err = record(patch.clone())
                .into_alert(UnknownPriorityPolicy::Medium)
                .unwrap_err();
            assert_eq!(err.to_string(), expect, "patch: {patch}");
        }
    }

    #[test]
    fn test_resolved_record() {
        let alert = record(serde_json::json!({
            "isResolved": true,
            "resolvedBy": "admin1",
            "resolvedAt": "2026-03-04T09:00:00Z",
            "resolutionAction": "dismissed",
        }))
        .into_alert(UnknownPriorityPolicy::Medium)
        .unwrap();

        assert_eq!(
            alert.resolution,
            Some(Resolution {
                resolved_by: "admin1".to_string(),
                resolved_at: "2026-03-04T09:00:00Z".parse().unwrap(),
                resolution_action: "dismissed".to_string(),
            })
        );
    }
}
