//! Error types for the agentmerge core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Ownership(#[from] OwnershipError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// History errors
// ---------------------------------------------------------------------------

/// Errors from the append-only history log.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HistoryError {
    /// No entry with the given id exists for the path.
    #[error("history entry {id} not found for '{path}'")]
    NotFound { path: String, id: u64 },
}

// ---------------------------------------------------------------------------
// Ownership errors
// ---------------------------------------------------------------------------

/// Errors from the ownership registry (owners, contributors, locks).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OwnershipError {
    /// The file already has an owner; later writers must go through a transfer.
    #[error("'{path}' is already owned by '{owner}'")]
    AlreadyOwned { path: String, owner: String },

    /// The file has no owner to transfer from.
    #[error("'{0}' has no owner")]
    NotFound(String),

    /// Another provider holds the lock.
    #[error("'{path}' is locked by '{holder}'")]
    Locked { path: String, holder: String },

    /// Unlock attempted by a provider that does not hold the lock.
    #[error("'{path}' is locked by '{holder}', not '{provider}'")]
    WrongOwner {
        path: String,
        holder: String,
        provider: String,
    },

    /// Unlock attempted on a file that is not locked.
    #[error("'{0}' is not locked")]
    NotLocked(String),
}

// ---------------------------------------------------------------------------
// Tracker errors
// ---------------------------------------------------------------------------

/// Errors surfaced by the [`Tracker`](crate::tracker::Tracker) entry points.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// No history exists for the path.
    #[error("no history for '{0}'")]
    NotFound(String),

    #[error(transparent)]
    Ownership(#[from] OwnershipError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

// ---------------------------------------------------------------------------
// Strategy errors
// ---------------------------------------------------------------------------

/// Errors from the merge strategy resolver.
///
/// Both variants are local to the file being resolved; batch resolution
/// records them per path instead of aborting.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StrategyError {
    /// The strategy name is not one of the supported strategies.
    #[error("unknown merge strategy: {0}")]
    UnknownStrategy(String),

    /// The `manual` strategy was requested in interactive mode.
    #[error("manual resolution required for '{0}'")]
    ManualResolutionRequired(String),
}

// ---------------------------------------------------------------------------
// Snapshot errors
// ---------------------------------------------------------------------------

/// Errors reading or writing history snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Snapshot file I/O failed.
    #[error("snapshot I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Snapshot content is not valid JSON for the expected shape.
    #[error("snapshot format error: {0}")]
    FormatError(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = OwnershipError::AlreadyOwned {
            path: "lib/x.ex".into(),
            owner: "p1".into(),
        };
        assert_eq!(err.to_string(), "'lib/x.ex' is already owned by 'p1'");

        let err = OwnershipError::WrongOwner {
            path: "f".into(),
            holder: "p1".into(),
            provider: "p2".into(),
        };
        assert_eq!(err.to_string(), "'f' is locked by 'p1', not 'p2'");

        let err = HistoryError::NotFound {
            path: "a.rs".into(),
            id: 7,
        };
        assert_eq!(err.to_string(), "history entry 7 not found for 'a.rs'");

        let err = StrategyError::UnknownStrategy("coin_flip".into());
        assert_eq!(err.to_string(), "unknown merge strategy: coin_flip");

        let err = ConfigError::InvalidValue {
            field: "merge.default_strategy".into(),
            detail: "bad".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid configuration value for 'merge.default_strategy': bad"
        );
    }

    #[test]
    fn test_core_error_from_conversions() {
        let err: CoreError = OwnershipError::NotLocked("f".into()).into();
        assert!(matches!(err, CoreError::Ownership(_)));
        assert_eq!(err.to_string(), "'f' is not locked");

        let err: CoreError = StrategyError::ManualResolutionRequired("g".into()).into();
        assert!(matches!(err, CoreError::Strategy(_)));

        let err: TrackerError = HistoryError::NotFound {
            path: "h".into(),
            id: 1,
        }
        .into();
        assert!(matches!(err, TrackerError::History(_)));
    }
}
