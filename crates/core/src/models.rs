//! Domain model types shared by the history log, registry, detector and
//! tracker.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Kind of operation a provider performed on a path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    Modify,
    Delete,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Modify => write!(f, "modify"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A proposed edit, carrying only the content relevant to its kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileOperation {
    /// A brand-new file. There is no prior content.
    Create { content: String },
    /// An edit of existing content. `before` is what the provider started from, if known.
    Modify {
        #[serde(default)]
        before: Option<String>,
        after: String,
    },
    /// Removal of the file. There is no resulting content.
    Delete {
        #[serde(default)]
        before: Option<String>,
    },
}

impl FileOperation {
    pub fn create(content: impl Into<String>) -> Self {
        Self::Create {
            content: content.into(),
        }
    }

    pub fn modify(before: impl Into<String>, after: impl Into<String>) -> Self {
        Self::Modify {
            before: Some(before.into()),
            after: after.into(),
        }
    }

    pub fn delete(before: impl Into<String>) -> Self {
        Self::Delete {
            before: Some(before.into()),
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Modify { .. } => OperationKind::Modify,
            Self::Delete { .. } => OperationKind::Delete,
        }
    }

    pub fn prior_content(&self) -> Option<&str> {
        match self {
            Self::Create { .. } => None,
            Self::Modify { before, .. } | Self::Delete { before } => before.as_deref(),
        }
    }

    pub fn result_content(&self) -> Option<&str> {
        match self {
            Self::Create { content } => Some(content),
            Self::Modify { after, .. } => Some(after),
            Self::Delete { .. } => None,
        }
    }
}

/// Half-open line range `[start, end)` touched by an operation.
///
/// `scope` optionally names the function or module the range lives in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl LineRange {
    /// Build a range, swapping the bounds if they arrive inverted.
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
            scope: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Range covering every line of `content`.
    pub fn whole(content: &str) -> Self {
        Self::new(0, content.lines().count())
    }

    /// Same range with the bounds in order.
    pub fn normalized(self) -> Self {
        Self {
            start: self.start.min(self.end),
            end: self.start.max(self.end),
            scope: self.scope,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Two half-open ranges intersect when each starts before the other ends.
    /// Empty ranges never overlap anything.
    pub fn overlaps(&self, other: &LineRange) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }
}

impl std::fmt::Display for LineRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "[{}, {}) in {}", self.start, self.end, scope),
            None => write!(f, "[{}, {})", self.start, self.end),
        }
    }
}

/// Optional metadata accompanying a tracked operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackOptions {
    #[serde(default)]
    pub line_range: Option<LineRange>,
}

impl TrackOptions {
    pub fn with_range(range: LineRange) -> Self {
        Self {
            line_range: Some(range),
        }
    }
}

// ---------------------------------------------------------------------------
// File status
// ---------------------------------------------------------------------------

/// Derived status of a tracked file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    /// Exactly one operation, a create.
    New,
    /// Anything else.
    Modified,
}

impl std::fmt::Display for FileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Modified => write!(f, "modified"),
        }
    }
}

/// Point-in-time view of one tracked file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileStatus {
    pub path: String,
    pub owner: Option<String>,
    pub status: FileState,
    pub contributors: Vec<String>,
    pub locked_by: Option<String>,
    pub operations: usize,
    pub last_provider: String,
}

/// Filter for [`Tracker::list_files`](crate::tracker::Tracker::list_files).
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Only files this provider has touched.
    pub provider: Option<String>,
}

impl ListFilter {
    pub fn provider(provider: impl Into<String>) -> Self {
        Self {
            provider: Some(provider.into()),
        }
    }
}

/// Unified diff from a file's original content to its current version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    /// Unified diff text.
    pub patch: String,
    pub additions: usize,
    pub deletions: usize,
}

/// Aggregate counters across all subsystems.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackerStats {
    pub total_operations: usize,
    pub files_tracked: usize,
    pub providers: usize,
    pub owned_files: usize,
    pub locked_files: usize,
    pub conflicts: usize,
    pub operations_by_kind: BTreeMap<OperationKind, usize>,
}
