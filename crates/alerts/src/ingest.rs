//! Classification of loosely-typed alert records into strict `Alert`s.
use models::{Alert, AlertRecord, Id, UnknownPriorityPolicy};
use serde::Serialize;

/// A record which was rejected, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejected {
    pub id: Id,
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Ingested {
    pub accepted: Vec<Alert>,
    pub rejected: Vec<Rejected>,
}

/// Classify `records` under `policy`. Records which cannot be classified
/// are quarantined rather than failing the whole batch.
pub fn ingest(records: impl IntoIterator<Item = AlertRecord>, policy: UnknownPriorityPolicy) -> Ingested {
    let mut out = Ingested::default();

    for record in records {
        let (id, title) = (record.id, record.title.clone());

        match record.into_alert(policy) {
            Ok(alert) => out.accepted.push(alert),
            Err(err) => {
                tracing::warn!(%id, %title, error = %err, "quarantined alert record");
                out.rejected.push(Rejected {
                    id,
                    title,
                    reason: err.to_string(),
                });
            }
        }
    }
    tracing::debug!(
        accepted = out.accepted.len(),
        rejected = out.rejected.len(),
        "ingested alert records"
    );
    out
}

/// Parse a JSON array of alert records.
pub fn parse_records(content: &[u8]) -> Result<Vec<AlertRecord>, serde_json::Error> {
    serde_json::from_slice(content)
}
