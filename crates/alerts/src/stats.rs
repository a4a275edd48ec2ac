use models::{Alert, AlertType, Priority};
use serde::Serialize;
use std::collections::BTreeMap;

/// Counts of alerts for each priority. All four priorities are always present.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriorityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PriorityCounts {
    pub fn get(&self, priority: Priority) -> usize {
        match priority {
            Priority::Critical => self.critical,
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
        }
    }

    fn increment(&mut self, priority: Priority) {
        match priority {
            Priority::Critical => self.critical += 1,
            Priority::High => self.high += 1,
            Priority::Medium => self.medium += 1,
            Priority::Low => self.low += 1,
        }
    }
}

/// Headline statistics of the backlog of active alerts.
/// These are computed over all active alerts, regardless of any filter.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStats {
    pub total: usize,
    pub by_priority: PriorityCounts,
    pub by_type: BTreeMap<AlertType, usize>,
}

impl AlertStats {
    pub fn from_alerts<'a>(alerts: impl IntoIterator<Item = &'a Alert>) -> Self {
        let mut stats = AlertStats::default();
        for alert in alerts {
            stats.total += 1;
            stats.by_priority.increment(alert.priority);
            *stats.by_type.entry(alert.alert_type).or_default() += 1;
        }
        stats
    }
}
