//! Persisted scan history.
//!
//! The whole history is one JSON array stored under [`HISTORY_KEY`]. Every
//! mutation rewrites the complete array.

use crate::error::{Error, Result};
use crate::features::kv_store::KeyValueStore;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

pub const HISTORY_KEY: &str = "scanHistory";

/// One decoded barcode as stored on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub data: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: String,
}

impl ScanRecord {
    pub fn new(kind: impl Into<String>, data: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            kind: kind.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Record stamped with the current UTC time, millisecond precision.
    pub fn now(kind: impl Into<String>, data: impl Into<String>) -> Self {
        Self::new(
            kind,
            data,
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        )
    }
}

/// Result of reading the stored array.
///
/// Elements that are not a complete record end up in `quarantined` rather
/// than in `records`. They are dropped on the next write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOutcome {
    pub records: Vec<ScanRecord>,
    pub quarantined: Vec<Value>,
}

/// Parse a stored history blob.
///
/// Empty input and JSON `null` read as an empty history. Anything else that
/// is not an array is an error.
pub fn parse_history(raw: &str) -> Result<LoadOutcome> {
    if raw.trim().is_empty() {
        return Ok(LoadOutcome::default());
    }
    let items = match serde_json::from_str::<Value>(raw)? {
        Value::Array(items) => items,
        Value::Null => return Ok(LoadOutcome::default()),
        other => {
            return Err(Error::NotAnArray {
                found: Error::json_kind(&other),
            })
        }
    };

    let mut outcome = LoadOutcome::default();
    for item in items {
        match ScanRecord::deserialize(&item) {
            Ok(record) => outcome.records.push(record),
            Err(_) => outcome.quarantined.push(item),
        }
    }
    Ok(outcome)
}

/// Copy of `records` without the element at `index`.
///
/// An out-of-range index returns the list unchanged.
pub fn without_index(records: &[ScanRecord], index: usize) -> Vec<ScanRecord> {
    records
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, r)| r.clone())
        .collect()
}

/// Repository over the history key.
///
/// Deletion has no method here: the screen removes the row from its own
/// list and writes that snapshot with [`HistoryRepository::save`], so the
/// stored array always matches what was shown. `append` is a
/// read-modify-write sequence and is not atomic; a concurrent writer to the
/// same key between the read and the write is overwritten (last write wins).
#[derive(Clone)]
pub struct HistoryRepository {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for HistoryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryRepository")
            .field("key", &HISTORY_KEY)
            .finish()
    }
}

impl HistoryRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<LoadOutcome> {
        let outcome = match self.store.get(HISTORY_KEY)? {
            Some(raw) => parse_history(&raw)?,
            None => LoadOutcome::default(),
        };
        if !outcome.quarantined.is_empty() {
            warn!(
                count = outcome.quarantined.len(),
                "quarantined malformed history entries"
            );
        }
        Ok(outcome)
    }

    pub fn save(&self, records: &[ScanRecord]) -> Result<()> {
        let json = serde_json::to_string(records)?;
        self.store.set(HISTORY_KEY, &json)
    }

    pub fn append(&self, record: ScanRecord) -> Result<Vec<ScanRecord>> {
        let mut records = self.load()?.records;
        records.push(record);
        self.save(&records)?;
        Ok(records)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(HISTORY_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::kv_store::{MemoryStore, SqliteStore};
    use serde_json::json;

    fn repo() -> (Arc<MemoryStore>, HistoryRepository) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), HistoryRepository::new(store))
    }

    fn sample(n: usize) -> Vec<ScanRecord> {
        (0..n)
            .map(|i| ScanRecord::new("QR", format!("item-{i}"), format!("2024-01-0{}T00:00:00Z", i + 1)))
            .collect()
    }

    #[test]
    fn absent_key_loads_empty() {
        let (_, repo) = repo();
        let outcome = repo.load().unwrap();
        assert!(outcome.records.is_empty());
        assert!(outcome.quarantined.is_empty());
    }

    #[test]
    fn empty_string_and_null_load_empty() {
        assert_eq!(parse_history("").unwrap(), LoadOutcome::default());
        assert_eq!(parse_history("null").unwrap(), LoadOutcome::default());
    }

    #[test]
    fn malformed_json_is_an_error() {
        let (store, repo) = repo();
        store.set(HISTORY_KEY, "[{not json").unwrap();
        assert!(matches!(repo.load(), Err(Error::Json(_))));
    }

    #[test]
    fn non_array_is_an_error() {
        let err = parse_history(r#"{"data":"x"}"#).unwrap_err();
        assert!(matches!(err, Error::NotAnArray { found: "object" }));
    }

    #[test]
    fn record_uses_type_field_name() {
        let record = ScanRecord::new("QR", "https://example.com", "2024-01-01T00:00:00Z");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({"data": "https://example.com", "type": "QR", "timestamp": "2024-01-01T00:00:00Z"})
        );
    }

    #[test]
    fn incomplete_entries_are_quarantined() {
        let raw = json!([
            {"data": "ok", "type": "QR", "timestamp": "2024-01-01T00:00:00Z"},
            {"data": "missing type", "timestamp": "2024-01-01T00:00:00Z"},
            {"data": 42, "type": "QR", "timestamp": "x"},
            "just a string",
            {"data": "extra", "type": "EAN_13", "timestamp": "t", "note": "kept out"}
        ])
        .to_string();
        let outcome = parse_history(&raw).unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].data, "ok");
        assert_eq!(outcome.records[1].kind, "EAN_13");
        assert_eq!(outcome.quarantined.len(), 3);
    }

    #[test]
    fn saving_snapshot_removes_only_that_position() {
        let (_, repo) = repo();
        let records = sample(4);
        repo.save(&records).unwrap();

        let after = without_index(&repo.load().unwrap().records, 1);
        repo.save(&after).unwrap();
        let expected: Vec<ScanRecord> = vec![records[0].clone(), records[2].clone(), records[3].clone()];
        assert_eq!(after, expected);
        assert_eq!(repo.load().unwrap().records, expected);
    }

    #[test]
    fn delete_every_position_preserves_order() {
        let records = sample(5);
        for i in 0..records.len() {
            let after = without_index(&records, i);
            assert_eq!(after.len(), records.len() - 1);
            let mut expected = records.clone();
            expected.remove(i);
            assert_eq!(after, expected);
        }
    }

    #[test]
    fn delete_out_of_range_keeps_list() {
        let records = sample(2);
        assert_eq!(without_index(&records, 7), records);
    }

    #[test]
    fn append_then_clear() {
        let (store, repo) = repo();
        repo.append(ScanRecord::new("QR", "a", "t1")).unwrap();
        let all = repo.append(ScanRecord::new("QR", "b", "t2")).unwrap();
        assert_eq!(all.iter().map(|r| r.data.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);

        repo.clear().unwrap();
        assert_eq!(store.get(HISTORY_KEY).unwrap(), None);
        assert!(repo.load().unwrap().records.is_empty());
    }

    #[test]
    fn save_drops_quarantined_entries() {
        let (store, repo) = repo();
        store
            .set(HISTORY_KEY, r#"[{"data":"a","type":"QR","timestamp":"t"},{"oops":true}]"#)
            .unwrap();
        let loaded = repo.load().unwrap();
        assert_eq!(loaded.quarantined.len(), 1);
        repo.save(&loaded.records).unwrap();
        let raw = store.get(HISTORY_KEY).unwrap().unwrap();
        assert_eq!(raw, r#"[{"data":"a","type":"QR","timestamp":"t"}]"#);
    }

    #[test]
    fn now_stamps_rfc3339_utc() {
        let record = ScanRecord::now("QR", "x");
        assert!(record.timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&record.timestamp).is_ok());
    }

    #[test]
    fn works_over_sqlite() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let repo = HistoryRepository::new(store);
        repo.save(&sample(3)).unwrap();
        let rest = without_index(&repo.load().unwrap().records, 0);
        repo.save(&rest).unwrap();
        assert_eq!(repo.load().unwrap().records, rest);
        assert_eq!(rest.len(), 2);
    }
}
