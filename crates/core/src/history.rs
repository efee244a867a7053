//! Append-only, per-file operation history.
//!
//! Every operation observed for a path is appended as an immutable
//! [`OperationRecord`]. Ids are globally unique and strictly increasing, and
//! timestamps are bumped forward when the wall clock does not advance, so
//! ordering by either field gives the recording order.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{HistoryError, SnapshotError};
use crate::models::{FileOperation, LineRange, OperationKind};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One immutable history entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationRecord {
    pub id: u64,
    pub path: String,
    pub provider: String,
    pub operation: FileOperation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_range: Option<LineRange>,
    pub recorded_at: DateTime<Utc>,
}

impl OperationRecord {
    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }

    pub fn prior_content(&self) -> Option<&str> {
        self.operation.prior_content()
    }

    pub fn result_content(&self) -> Option<&str> {
        self.operation.result_content()
    }
}

/// Counters reported by [`HistoryLog::stats`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryStats {
    pub total_entries: usize,
    pub files_tracked: usize,
}

/// Serializable copy of the whole log, ordered by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub entries: Vec<OperationRecord>,
}

impl HistorySnapshot {
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!(path = %path.display(), entries = self.entries.len(), "history snapshot saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path)?;
        let snapshot: HistorySnapshot = serde_json::from_str(&content)?;
        info!(path = %path.display(), entries = snapshot.entries.len(), "history snapshot loaded");
        Ok(snapshot)
    }
}

// ---------------------------------------------------------------------------
// Log
// ---------------------------------------------------------------------------

/// The history log. Not synchronized; the tracker owns the locking.
#[derive(Debug)]
pub struct HistoryLog {
    entries: HashMap<String, Vec<OperationRecord>>,
    next_id: u64,
    last_recorded_at: Option<DateTime<Utc>>,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryLog {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_id: 1,
            last_recorded_at: None,
        }
    }

    /// Append an operation. Never fails.
    pub fn record(
        &mut self,
        path: &str,
        provider: &str,
        operation: FileOperation,
        line_range: Option<LineRange>,
    ) -> OperationRecord {
        let id = self.next_id;
        self.next_id += 1;

        let now = Utc::now();
        let recorded_at = match self.last_recorded_at {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_recorded_at = Some(recorded_at);

        let record = OperationRecord {
            id,
            path: path.to_string(),
            provider: provider.to_string(),
            operation,
            line_range,
            recorded_at,
        };
        debug!(id, path, provider, kind = %record.kind(), "operation recorded");

        self.entries
            .entry(path.to_string())
            .or_default()
            .push(record.clone());
        record
    }

    /// Entries for `path`, newest first. Empty for unknown paths.
    pub fn file_history(&self, path: &str) -> Vec<OperationRecord> {
        self.entries
            .get(path)
            .map(|list| list.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    /// Entries for `path` in recording order, without cloning.
    pub fn entries_for(&self, path: &str) -> &[OperationRecord] {
        self.entries.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every entry by `provider` across all paths, newest first.
    pub fn provider_history(&self, provider: &str) -> Vec<OperationRecord> {
        let mut out: Vec<OperationRecord> = self
            .entries
            .values()
            .flatten()
            .filter(|r| r.provider == provider)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.id.cmp(&a.id));
        out
    }

    /// Resulting content of the newest entry, or `None` if there is none
    /// (or the newest entry is a delete).
    pub fn current_version(&self, path: &str) -> Option<String> {
        self.entries
            .get(path)
            .and_then(|list| list.last())
            .and_then(|r| r.result_content().map(str::to_string))
    }

    /// Content stored by entry `id`. Does not modify the log; callers record a
    /// new modify operation to persist a revert.
    pub fn revert_to_version(&self, path: &str, id: u64) -> Result<Option<String>, HistoryError> {
        self.entries
            .get(path)
            .and_then(|list| list.iter().find(|r| r.id == id))
            .map(|r| r.result_content().map(str::to_string))
            .ok_or_else(|| HistoryError::NotFound {
                path: path.to_string(),
                id,
            })
    }

    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            total_entries: self.entries.values().map(Vec::len).sum(),
            files_tracked: self.entries.len(),
        }
    }

    /// Tracked paths in sorted order.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.entries.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Distinct providers that have recorded anything.
    pub fn providers(&self) -> BTreeSet<String> {
        self.entries
            .values()
            .flatten()
            .map(|r| r.provider.clone())
            .collect()
    }

    pub fn all_entries(&self) -> impl Iterator<Item = &OperationRecord> {
        self.entries.values().flatten()
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        let mut entries: Vec<OperationRecord> = self.all_entries().cloned().collect();
        entries.sort_by_key(|r| r.id);
        HistorySnapshot { entries }
    }

    /// Replace the log with the snapshot's entries. Id assignment continues
    /// after the highest restored id.
    pub fn restore(&mut self, snapshot: HistorySnapshot) {
        self.clear();
        let mut entries = snapshot.entries;
        entries.sort_by_key(|r| r.id);
        for record in entries {
            self.next_id = self.next_id.max(record.id + 1);
            self.last_recorded_at = Some(match self.last_recorded_at {
                Some(last) if last > record.recorded_at => last,
                _ => record.recorded_at,
            });
            self.entries
                .entry(record.path.clone())
                .or_default()
                .push(record);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_id = 1;
        self.last_recorded_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_and_timestamps_increase() {
        let mut log = HistoryLog::new();
        let a = log.record("a.rs", "p1", FileOperation::create("1"), None);
        let b = log.record("b.rs", "p2", FileOperation::create("2"), None);
        let c = log.record("a.rs", "p2", FileOperation::modify("1", "3"), None);
        assert!(a.id < b.id && b.id < c.id);
        assert!(a.recorded_at < b.recorded_at && b.recorded_at < c.recorded_at);
    }

    #[test]
    fn test_file_history_newest_first() {
        let mut log = HistoryLog::new();
        log.record("a.rs", "p1", FileOperation::create("1"), None);
        log.record("a.rs", "p1", FileOperation::modify("1", "2"), None);
        let history = log.file_history("a.rs");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].result_content(), Some("2"));
        assert_eq!(history[1].result_content(), Some("1"));
        assert!(log.file_history("missing.rs").is_empty());
    }

    #[test]
    fn test_current_version() {
        let mut log = HistoryLog::new();
        assert_eq!(log.current_version("a.rs"), None);
        log.record("a.rs", "p1", FileOperation::create("1"), None);
        log.record("a.rs", "p2", FileOperation::modify("1", "2"), None);
        assert_eq!(log.current_version("a.rs").as_deref(), Some("2"));
        log.record("a.rs", "p2", FileOperation::delete("2"), None);
        assert_eq!(log.current_version("a.rs"), None);
    }

    #[test]
    fn test_provider_history_spans_paths() {
        let mut log = HistoryLog::new();
        log.record("a.rs", "p1", FileOperation::create("1"), None);
        log.record("b.rs", "p2", FileOperation::create("2"), None);
        log.record("c.rs", "p1", FileOperation::create("3"), None);
        let history = log.provider_history("p1");
        let paths: Vec<&str> = history.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["c.rs", "a.rs"]);
    }

    #[test]
    fn test_revert_does_not_mutate() {
        let mut log = HistoryLog::new();
        let first = log.record("a.rs", "p1", FileOperation::create("one\r\n"), None);
        log.record("a.rs", "p1", FileOperation::modify("one\r\n", "two"), None);

        let content = log.revert_to_version("a.rs", first.id).unwrap();
        assert_eq!(content.as_deref(), Some("one\r\n"));
        assert_eq!(log.current_version("a.rs").as_deref(), Some("two"));
        assert_eq!(log.stats().total_entries, 2);
    }

    #[test]
    fn test_revert_unknown_id() {
        let mut log = HistoryLog::new();
        let rec = log.record("a.rs", "p1", FileOperation::create("1"), None);
        assert_eq!(
            log.revert_to_version("b.rs", rec.id),
            Err(HistoryError::NotFound {
                path: "b.rs".into(),
                id: rec.id
            })
        );
        assert!(log.revert_to_version("a.rs", 99).is_err());
    }

    #[test]
    fn test_snapshot_restore_continues_ids() {
        let mut log = HistoryLog::new();
        log.record("a.rs", "p1", FileOperation::create("1"), None);
        log.record("b.rs", "p2", FileOperation::create("2"), None);
        let snapshot = log.snapshot();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        snapshot.save(&path).unwrap();

        let mut restored = HistoryLog::new();
        restored.restore(HistorySnapshot::load(&path).unwrap());
        assert_eq!(restored.stats(), log.stats());

        let next = restored.record("a.rs", "p1", FileOperation::modify("1", "3"), None);
        assert_eq!(next.id, 3);
        assert!(next.recorded_at > snapshot.entries[1].recorded_at);
    }
}
