use models::{Alert, Priority};
use serde::Serialize;

/// Sort alerts by priority (critical first), and then by creation time with
/// the most recent first. The sort is stable.
pub fn sort(alerts: &mut [Alert]) {
    alerts.sort_by(|l, r| {
        l.priority
            .rank()
            .cmp(&r.priority.rank())
            .then_with(|| r.created_at.cmp(&l.created_at))
    });
}

/// PriorityGroups partitions alerts into one bucket per priority.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct PriorityGroups {
    pub critical: Vec<Alert>,
    pub high: Vec<Alert>,
    pub medium: Vec<Alert>,
    pub low: Vec<Alert>,
}

impl PriorityGroups {
    pub fn bucket(&self, priority: Priority) -> &[Alert] {
        match priority {
            Priority::Critical => &self.critical,
            Priority::High => &self.high,
            Priority::Medium => &self.medium,
            Priority::Low => &self.low,
        }
    }

    fn bucket_mut(&mut self, priority: Priority) -> &mut Vec<Alert> {
        match priority {
            Priority::Critical => &mut self.critical,
            Priority::High => &mut self.high,
            Priority::Medium => &mut self.medium,
            Priority::Low => &mut self.low,
        }
    }

    /// Total number of grouped alerts.
    pub fn len(&self) -> usize {
        Priority::ALL.iter().map(|p| self.bucket(*p).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over all alerts in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &Alert> + '_ {
        Priority::ALL.iter().flat_map(move |p| self.bucket(*p).iter())
    }
}

/// Group alerts by their priority. Each bucket retains the relative order of
/// `alerts`, so sorted input yields sorted buckets.
pub fn group_by_priority(alerts: impl IntoIterator<Item = Alert>) -> PriorityGroups {
    let mut groups = PriorityGroups::default();
    for alert in alerts {
        groups.bucket_mut(alert.priority).push(alert);
    }
    groups
}
