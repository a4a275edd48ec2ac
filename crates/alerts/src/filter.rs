use chrono::NaiveDate;
use models::{Alert, AlertType, Priority};

/// Selector matches either all values, or only a specific one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<T> {
    All,
    Only(T),
}

impl<T> Default for Selector<T> {
    fn default() -> Self {
        Selector::All
    }
}

impl<T: PartialEq> Selector<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Selector::All => true,
            Selector::Only(expect) => expect == value,
        }
    }
}

/// Parses "all" as `Selector::All`, and anything else as a `T`.
impl<T: std::str::FromStr> std::str::FromStr for Selector<T> {
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(Selector::All)
        } else {
            s.parse().map(Selector::Only)
        }
    }
}

/// Inclusive range of days, compared against the UTC creation date of an alert.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, alert: &Alert) -> bool {
        let day = alert.created_at.date_naive();
        self.start.map_or(true, |start| day >= start) && self.end.map_or(true, |end| day <= end)
    }
}

/// AlertFilter is a conjunction of optional criteria over alerts.
/// An alert passes the filter only if it matches every enabled criterion.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AlertFilter {
    pub alert_type: Selector<AlertType>,
    pub priority: Selector<Priority>,
    pub date_range: DateRange,
    /// Case-insensitive search over the title, description, and source data.
    /// A blank term matches everything.
    pub search_term: Option<String>,
}

impl AlertFilter {
    pub fn with_type(mut self, alert_type: AlertType) -> Self {
        self.alert_type = Selector::Only(alert_type);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Selector::Only(priority);
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search_term = Some(term.into());
        self
    }

    pub fn with_dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.date_range = DateRange { start, end };
        self
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        self.criteria().matches(alert)
    }

    fn criteria(&self) -> Criteria<'_> {
        let needle = self
            .search_term
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(|term| models::collate(term.chars()).collect());

        Criteria {
            filter: self,
            needle,
        }
    }
}

// Criteria is an AlertFilter prepared for repeated matching.
struct Criteria<'f> {
    filter: &'f AlertFilter,
    needle: Option<String>,
}

impl Criteria<'_> {
    fn matches(&self, alert: &Alert) -> bool {
        self.filter.alert_type.matches(&alert.alert_type)
            && self.filter.priority.matches(&alert.priority)
            && self.filter.date_range.contains(alert)
            && self.needle.as_ref().map_or(true, |needle| {
                search_text(alert).contains(needle.as_str())
            })
    }
}

// Collated text of the alert which is matched by free-text search.
fn search_text(alert: &Alert) -> String {
    let source_data = serde_json::to_string(&alert.source_data).unwrap_or_default();

    let text = [
        alert.title.as_str(),
        alert.description.as_str(),
        source_data.as_str(),
    ]
    .join("\n");

    models::collate(text.chars()).collect()
}

/// Returns the alerts which pass `filter`. Relative order is preserved,
/// but callers should sort the result (see `grouping::sort`).
pub fn apply(alerts: &[Alert], filter: &AlertFilter) -> Vec<Alert> {
    let criteria = filter.criteria();
    alerts
        .iter()
        .filter(|alert| criteria.matches(alert))
        .cloned()
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{alert, at, ids};
    use pretty_assertions::assert_eq;

    fn fixtures() -> Vec<Alert> {
        let mut a1 = alert(1, Priority::High, 0);
        a1.title = "Overdue: Dell LAPTOP XPS 13".to_string();

        let mut a2 = alert(2, Priority::High, 60 * 24);
        a2.alert_type = AlertType::ReservationConflict;
        a2.title = "Reservation conflict".to_string();
        a2.source_data
            .insert("equipment".to_string(), serde_json::json!("ThinkPad laptop"));

        let mut a3 = alert(3, Priority::Low, 60 * 24 * 2);
        a3.description = "Borrower kept the laptop charger".to_string();

        let mut a4 = alert(4, Priority::Critical, 60 * 24 * 2 + 1439);
        a4.alert_type = AlertType::NoShowPattern;
        a4.title = "Three no-shows in a row".to_string();

        vec![a1, a2, a3, a4]
    }

    #[test]
    fn test_default_filter_matches_everything() {
        let alerts = fixtures();
        assert_eq!(ids(&apply(&alerts, &AlertFilter::default())), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_filter_conjunction() {
        let alerts = fixtures();

        let filter = AlertFilter::default()
            .with_priority(Priority::High)
            .with_search("laptop");
        assert_eq!(ids(&apply(&alerts, &filter)), vec![1, 2]);

        let filter = filter.with_type(AlertType::ReservationConflict);
        assert_eq!(ids(&apply(&alerts, &filter)), vec![2]);

        let filter = filter.with_priority(Priority::Critical);
        assert!(apply(&alerts, &filter).is_empty());
    }

    #[test]
    fn test_search_term() {
        let alerts = fixtures();
        let search = |term: &str| ids(&apply(&alerts, &AlertFilter::default().with_search(term)));

        // Matches title, source data, and description, ignoring case.
        assert_eq!(search("LapTop"), vec![1, 2, 3]);
        assert_eq!(search("  charger "), vec![3]);
        assert_eq!(search("thinkpad"), vec![2]);
        // Source data keys are searchable too.
        assert_eq!(search("equipment"), vec![2]);
        // Blank terms disable the criterion.
        assert_eq!(search("   "), vec![1, 2, 3, 4]);
        assert_eq!(search(""), vec![1, 2, 3, 4]);
        assert!(search("projector").is_empty());
    }

    #[test]
    fn test_date_range_is_inclusive_by_day() {
        let alerts = fixtures();
        let day = |minutes| Some(at(minutes).date_naive());
        let range = |start, end| ids(&apply(&alerts, &AlertFilter::default().with_dates(start, end)));

        assert_eq!(range(day(60 * 24), None), vec![2, 3, 4]);
        assert_eq!(range(None, day(60 * 24)), vec![1, 2]);
        // Alert 4 was created at 23:59 of the end day.
        assert_eq!(range(day(60 * 24 * 2), day(60 * 24 * 2)), vec![3, 4]);
        assert!(range(day(60 * 24 * 3), None).is_empty());
    }

    #[test]
    fn test_selector_parsing() {
        assert_eq!("all".parse::<Selector<Priority>>(), Ok(Selector::All));
        assert_eq!("ALL".parse::<Selector<AlertType>>(), Ok(Selector::All));
        assert_eq!(
            "high".parse::<Selector<Priority>>(),
            Ok(Selector::Only(Priority::High))
        );
        assert!("urgent".parse::<Selector<Priority>>().is_err());
    }
}
