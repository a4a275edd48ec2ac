use chrono::{DateTime, TimeZone, Utc};
use models::{ActionKind, Alert, AlertType, Id, Priority, QuickAction, Resolution};

/// Base time of test fixtures. Fixtures are created `minutes` after it.
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
}

pub fn alert(id: u64, priority: Priority, minutes: i64) -> Alert {
    Alert {
        id: Id::from(id),
        alert_type: AlertType::OverdueLoan,
        priority,
        title: format!("Alert {id}"),
        description: String::new(),
        source_data: Default::default(),
        quick_actions: vec![
            quick_action("dismiss", ActionKind::Dismiss),
            quick_action("contacted", ActionKind::MarkContacted),
            quick_action("remind", ActionKind::SendReminder),
        ],
        created_at: at(minutes),
        resolution: None,
    }
}

pub fn quick_action(id: &str, action: ActionKind) -> QuickAction {
    QuickAction {
        id: id.to_string(),
        label: id.to_string(),
        action,
        params: Default::default(),
    }
}

pub fn resolution(actor: &str, action: &str) -> Resolution {
    Resolution {
        resolved_by: actor.to_string(),
        resolved_at: at(1_000),
        resolution_action: action.to_string(),
    }
}

pub fn ids(alerts: &[Alert]) -> Vec<u64> {
    alerts
        .iter()
        .map(|a| a.id.as_u64())
        .collect()
}
