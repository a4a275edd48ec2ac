use alerts::{Ingested, MemoryStore, Rejected};
use anyhow::Context;
use models::{Alert, AlertRecord, UnknownPriorityPolicy};
use std::path::{Path, PathBuf};

/// Fixture is a JSON file of alert records, which backs the in-memory store.
pub struct Fixture {
    path: PathBuf,
    records: Vec<AlertRecord>,
    ingested: Ingested,
}

impl Fixture {
    pub fn load(path: &Path, policy: UnknownPriorityPolicy) -> anyhow::Result<Self> {
        let content = std::fs::read(path)
            .with_context(|| format!("failed to read alerts from {}", path.display()))?;
        let records = alerts::ingest::parse_records(&content)
            .with_context(|| format!("failed to parse alert records of {}", path.display()))?;

        let ingested = alerts::ingest(records.clone(), policy);
        if !ingested.rejected.is_empty() {
            tracing::warn!(
                rejected = ingested.rejected.len(),
                "some alert records were quarantined (see `alertctl rejected`)"
            );
        }

        Ok(Self {
            path: path.to_owned(),
            records,
            ingested,
        })
    }

    pub fn accepted(&self) -> Vec<Alert> {
        self.ingested.accepted.clone()
    }

    pub fn rejected(&self) -> &[Rejected] {
        &self.ingested.rejected
    }

    /// Write resolutions held by `store` back to the file. Only the
    /// resolution fields of records change, and quarantined records are kept.
    /// Returns the number of newly resolved records.
    pub fn write_back(&mut self, store: &MemoryStore) -> anyhow::Result<usize> {
        let mut updated = 0;

        for record in self.records.iter_mut().filter(|r| !r.is_resolved) {
            let Some(resolution) = store.get(record.id).and_then(|a| a.resolution) else {
                continue;
            };
            record.is_resolved = true;
            record.resolved_by = Some(resolution.resolved_by);
            record.resolved_at = Some(resolution.resolved_at);
            record.resolution_action = Some(resolution.resolution_action);
            updated += 1;
        }
        if updated == 0 {
            return Ok(0);
        }

        let content = serde_json::to_vec_pretty(&self.records)?;
        let tmp = self.path.with_extension("tmp");

        // Replace the file by rename, so that it's never partially written.
        std::fs::write(&tmp, content)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;

        tracing::info!(updated, path = %self.path.display(), "wrote resolutions to alerts file");
        Ok(updated)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{TimeZone, Utc};
    use models::Resolution;

    const RECORDS: &str = r#"[
        {
            "id": "0000000000000001",
            "type": "reservation_conflict",
            "priority": "high",
            "title": "Overlapping reservations of Projector #4",
            "quickActions": [{"id": "dismiss", "label": "Dismiss", "action": "dismiss"}],
            "createdAt": "2026-03-01T10:00:00Z"
        },
        {
            "id": "0000000000000002",
            "type": "lost_item",
            "priority": "low",
            "title": "Unclassifiable",
            "createdAt": "2026-03-01T11:00:00Z"
        }
    ]"#;

    #[test]
    fn test_load_and_write_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.json");
        std::fs::write(&path, RECORDS).unwrap();

        let mut fixture = Fixture::load(&path, UnknownPriorityPolicy::Medium).unwrap();
        assert_eq!(fixture.accepted().len(), 1);
        assert_eq!(fixture.rejected().len(), 1);

        let store = MemoryStore::new(fixture.accepted());
        assert_eq!(fixture.write_back(&store).unwrap(), 0);

        let mut resolved = fixture.accepted().remove(0);
        resolved.resolution = Some(Resolution {
            resolved_by: "admin1".to_string(),
            resolved_at: Utc.with_ymd_and_hms(2026, 3, 2, 8, 30, 0).unwrap(),
            resolution_action: "dismissed".to_string(),
        });
        store.insert(resolved);
        assert_eq!(fixture.write_back(&store).unwrap(), 1);
        // Already written resolutions aren't written again.
        assert_eq!(fixture.write_back(&store).unwrap(), 0);

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        insta::assert_json_snapshot!(written, @r###"
        [
          {
            "createdAt": "2026-03-01T10:00:00Z",
            "description": "",
            "id": "0000000000000001",
            "isResolved": true,
            "priority": "high",
            "quickActions": [
              {
                "action": "dismiss",
                "id": "dismiss",
                "label": "Dismiss",
                "params": {}
              }
            ],
            "resolutionAction": "dismissed",
            "resolvedAt": "2026-03-02T08:30:00Z",
            "resolvedBy": "admin1",
            "sourceData": {},
            "title": "Overlapping reservations of Projector #4",
            "type": "reservation_conflict"
          },
          {
            "createdAt": "2026-03-01T11:00:00Z",
            "description": "",
            "id": "0000000000000002",
            "isResolved": false,
            "priority": "low",
            "quickActions": [],
            "sourceData": {},
            "title": "Unclassifiable",
            "type": "lost_item"
          }
        ]
        "###);

        // The resolved alert is no longer active upon reload.
        let fixture = Fixture::load(&path, UnknownPriorityPolicy::Medium).unwrap();
        assert!(fixture.accepted()[0].is_resolved());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");

        let err = Fixture::load(&path, UnknownPriorityPolicy::Medium)
            .err()
            .unwrap();
        assert!(err.to_string().starts_with("failed to read alerts from "));

        std::fs::write(&path, "{}").unwrap();
        let err = Fixture::load(&path, UnknownPriorityPolicy::Medium)
            .err()
            .unwrap();
        assert!(err.to_string().starts_with("failed to parse alert records of "));
    }
}
