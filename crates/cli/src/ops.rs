//! Operation log files replayed by `agentmerge replay`.
//!
//! An operation log is a JSON array of entries, applied in order:
//!
//! ```json
//! [
//!   { "provider": "p1", "path": "lib/x.ex",
//!     "operation": { "kind": "create", "content": "a" } },
//!   { "provider": "p2", "path": "lib/x.ex",
//!     "operation": { "kind": "modify", "before": "a", "after": "b" },
//!     "line_range": { "start": 0, "end": 1 } },
//!   { "provider": "p2", "path": "lib/x.ex", "lock": true }
//! ]
//! ```
//!
//! An entry carries either an `operation` or a `lock` flag (`true` to lock,
//! `false` to unlock).

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use agentmerge_core::models::{LineRange, TrackOptions};
use agentmerge_core::{FileOperation, Tracker};

/// One replayable entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpEntry {
    pub provider: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<FileOperation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_range: Option<LineRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock: Option<bool>,
}

/// Counters from a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub operations: usize,
    pub lock_changes: usize,
    pub rejected: usize,
}

pub async fn load(path: &Path) -> Result<Vec<OpEntry>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read operation log {}", path.display()))?;
    parse(&raw).with_context(|| format!("invalid operation log {}", path.display()))
}

pub fn parse(raw: &str) -> Result<Vec<OpEntry>> {
    let entries: Vec<OpEntry> = serde_json::from_str(raw)?;
    for (i, entry) in entries.iter().enumerate() {
        match (&entry.operation, entry.lock) {
            (Some(_), Some(_)) => {
                anyhow::bail!("entry {} has both an operation and a lock flag", i)
            }
            (None, None) => anyhow::bail!("entry {} has neither an operation nor a lock flag", i),
            _ => {}
        }
    }
    Ok(entries)
}

/// Apply entries in order. Rejected lock changes are logged and counted,
/// never fatal.
pub fn replay(tracker: &Tracker, entries: Vec<OpEntry>) -> ReplaySummary {
    let mut summary = ReplaySummary::default();
    for entry in entries {
        if let Some(operation) = entry.operation {
            let options = TrackOptions {
                line_range: entry.line_range,
            };
            tracker.track_file_operation(&entry.provider, &entry.path, operation, options);
            summary.operations += 1;
            continue;
        }

        let result = match entry.lock {
            Some(true) => tracker.lock_file(&entry.path, &entry.provider),
            Some(false) => tracker.unlock_file(&entry.path, &entry.provider),
            None => continue,
        };
        match result {
            Ok(()) => summary.lock_changes += 1,
            Err(e) => {
                warn!(
                    path = %entry.path,
                    provider = %entry.provider,
                    error = %e,
                    "lock change rejected",
                );
                summary.rejected += 1;
            }
        }
    }
    debug!(?summary, "replay complete");
    summary
}
