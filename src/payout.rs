use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;

/// One committed earning session. Immutable once stored; amounts are USD
/// regardless of the display currency at commit time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayoutRecord {
    pub id: u64,
    pub amount: f64,
    pub timestamp: DateTime<Local>,
}

impl PayoutRecord {
    pub fn new(id: u64, amount: f64, timestamp: DateTime<Local>) -> Self {
        Self {
            id,
            amount,
            timestamp,
        }
    }

    pub fn formatted_date(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M").to_string()
    }
}

/// Next free record id: rowid-style, one past the largest in use.
pub fn next_payout_id(records: &[PayoutRecord]) -> u64 {
    records.iter().map(|r| r.id).max().map_or(1, |id| id + 1)
}

/// Sum of all recorded amounts, in USD.
pub fn payout_total(records: &[PayoutRecord]) -> f64 {
    records.iter().map(|r| r.amount).sum()
}

pub trait PayoutStore {
    /// Full history, newest first. Missing or unreadable data degrades to
    /// an empty list.
    fn load(&self) -> Vec<PayoutRecord>;
    /// Replace the persisted history with `records` wholesale.
    fn save(&self, records: &[PayoutRecord]) -> std::io::Result<()>;
    /// Drop all persisted records.
    fn clear(&self) -> std::io::Result<()>;
}

/// History persisted as a single JSON array in one file.
#[derive(Debug, Clone)]
pub struct FilePayoutStore {
    path: PathBuf,
}

impl FilePayoutStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::payouts_path().unwrap_or_else(|| PathBuf::from("wagewatch_payouts.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl PayoutStore for FilePayoutStore {
    fn load(&self) -> Vec<PayoutRecord> {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(records) = serde_json::from_slice::<Vec<PayoutRecord>>(&bytes) {
                return records;
            }
        }
        Vec::new()
    }

    fn save(&self, records: &[PayoutRecord]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(records).unwrap_or_default();
        fs::write(&self.path, data)
    }

    fn clear(&self) -> std::io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn record(id: u64, amount: f64) -> PayoutRecord {
        let timestamp = Local.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        PayoutRecord::new(id, amount, timestamp)
    }

    #[test]
    fn roundtrips_records() {
        let dir = tempdir().unwrap();
        let store = FilePayoutStore::with_path(dir.path().join("payouts.json"));

        let records = vec![record(2, 12.34), record(1, 1.0)];
        store.save(&records).unwrap();
        assert_eq!(store.load(), records);
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = FilePayoutStore::with_path(dir.path().join("nope.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn load_corrupt_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("payouts.json");
        fs::write(&path, b"{ this is not json").unwrap();
        let store = FilePayoutStore::with_path(&path);
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_replaces_wholesale() {
        let dir = tempdir().unwrap();
        let store = FilePayoutStore::with_path(dir.path().join("payouts.json"));

        store.save(&[record(1, 1.0), record(2, 2.0)]).unwrap();
        store.save(&[record(3, 3.0)]).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, 3);
    }

    #[test]
    fn save_preserves_order() {
        let dir = tempdir().unwrap();
        let store = FilePayoutStore::with_path(dir.path().join("payouts.json"));

        // Newest first, as the app maintains it
        let records = vec![record(3, 3.0), record(2, 2.0), record(1, 1.0)];
        store.save(&records).unwrap();
        let loaded = store.load();
        assert_eq!(
            loaded.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![3, 2, 1]
        );
    }

    #[test]
    fn clear_removes_history() {
        let dir = tempdir().unwrap();
        let store = FilePayoutStore::with_path(dir.path().join("payouts.json"));

        store.save(&[record(1, 1.0)]).unwrap();
        store.clear().unwrap();
        assert!(store.load().is_empty());

        // Clearing an already-empty store is fine
        store.clear().unwrap();
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let store = FilePayoutStore::with_path(dir.path().join("deep").join("payouts.json"));
        store.save(&[record(1, 1.0)]).unwrap();
        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn next_id_counts_up_from_largest() {
        assert_eq!(next_payout_id(&[]), 1);
        assert_eq!(next_payout_id(&[record(1, 1.0)]), 2);
        assert_eq!(next_payout_id(&[record(7, 1.0), record(3, 2.0)]), 8);
    }

    #[test]
    fn total_sums_amounts() {
        assert_eq!(payout_total(&[]), 0.0);
        let records = vec![record(1, 122.50), record(2, 75.25), record(3, 42.30)];
        assert!((payout_total(&records) - 240.05).abs() < 1e-9);
    }

    #[test]
    fn formatted_date_is_short_local() {
        assert_eq!(record(1, 1.0).formatted_date(), "2026-03-14 09:26");
    }
}
