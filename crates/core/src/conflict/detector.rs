//! Conflict detection logic.
//!
//! Given the history entries recorded for one path, the detector decides
//! whether the providers who touched it collide. Conflicts are never stored;
//! they are recomputed from history whenever queried.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::history::OperationRecord;
use crate::models::{LineRange, OperationKind};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Categorisation of a conflict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Two or more providers independently created the same path.
    FileLevel,
    /// Providers' most recent line ranges intersect.
    LineLevel,
    /// A single provider, or several with disjoint ranges. Auto-resolvable.
    Addition,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileLevel => write!(f, "file_level"),
            Self::LineLevel => write!(f, "line_level"),
            Self::Addition => write!(f, "addition"),
        }
    }
}

/// One provider's stake in a conflicted path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderVersion {
    pub provider: String,
    /// Resulting content of the provider's newest operation (`None` after a delete).
    pub content: Option<String>,
    /// Content the provider's newest operation started from, if known.
    pub prior_content: Option<String>,
    /// Range of the provider's newest operation. Whole-file when none was supplied.
    pub range: LineRange,
    /// Whether the provider's first operation on the path was a create.
    pub created: bool,
    pub first_op_id: u64,
    pub first_recorded_at: chrono::DateTime<chrono::Utc>,
    pub last_op_id: u64,
    pub last_recorded_at: chrono::DateTime<chrono::Utc>,
}

/// A detected collision (or trivially resolvable addition) on one path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conflict {
    pub path: String,
    pub kind: ConflictKind,
    /// Contending providers, sorted. Order does not encode precedence.
    pub providers: Vec<String>,
    /// Per-provider detail for the contending providers, in order of first appearance.
    pub versions: Vec<ProviderVersion>,
    /// Shared starting content for range-preserving merges, when one is known.
    pub base: Option<String>,
}

impl Conflict {
    /// `false` for additions, which never block a merge.
    pub fn is_blocking(&self) -> bool {
        !matches!(self.kind, ConflictKind::Addition)
    }

    /// Provider to range mapping.
    pub fn ranges(&self) -> BTreeMap<String, LineRange> {
        self.versions
            .iter()
            .map(|v| (v.provider.clone(), v.range.clone()))
            .collect()
    }

    /// `true` when no two providers' ranges intersect.
    pub fn has_disjoint_ranges(&self) -> bool {
        overlapping_providers(&self.versions).is_empty()
    }

    pub fn version(&self, provider: &str) -> Option<&ProviderVersion> {
        self.versions.iter().find(|v| v.provider == provider)
    }

    /// `(provider, content)` pairs for providers that still have content,
    /// ordered by their newest operation.
    pub fn contents(&self) -> Vec<(&str, &str)> {
        let mut versions: Vec<&ProviderVersion> = self.versions.iter().collect();
        versions.sort_by_key(|v| v.last_op_id);
        versions
            .into_iter()
            .filter_map(|v| v.content.as_deref().map(|c| (v.provider.as_str(), c)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Stateless conflict detector over one path's history.
pub struct ConflictDetector;

impl ConflictDetector {
    /// Classify the entries recorded for `path` (in recording order).
    ///
    /// Returns `None` only when there is no history at all; a single provider
    /// yields an [`ConflictKind::Addition`].
    pub fn detect(path: &str, entries: &[OperationRecord]) -> Option<Conflict> {
        let versions = provider_versions(entries);
        if versions.is_empty() {
            return None;
        }

        let kind;
        let contending: Vec<ProviderVersion>;

        if versions.len() == 1 {
            kind = ConflictKind::Addition;
            contending = versions;
        } else if versions.iter().filter(|v| v.created).count() >= 2 {
            kind = ConflictKind::FileLevel;
            contending = versions;
        } else {
            let overlapping = overlapping_providers(&versions);
            if overlapping.is_empty() {
                kind = ConflictKind::Addition;
                contending = versions;
            } else {
                kind = ConflictKind::LineLevel;
                contending = versions
                    .into_iter()
                    .filter(|v| overlapping.contains(&v.provider))
                    .collect();
            }
        }

        let mut providers: Vec<String> = contending.iter().map(|v| v.provider.clone()).collect();
        providers.sort();

        let conflict = Conflict {
            path: path.to_string(),
            kind,
            providers,
            base: shared_base(&contending),
            versions: contending,
        };
        debug!(
            path,
            kind = %conflict.kind,
            providers = ?conflict.providers,
            "conflict classified"
        );
        Some(conflict)
    }
}

/// Collapse entries into one [`ProviderVersion`] per provider, ordered by first appearance.
fn provider_versions(entries: &[OperationRecord]) -> Vec<ProviderVersion> {
    let mut versions: Vec<ProviderVersion> = Vec::new();

    for entry in entries {
        let range = entry
            .line_range
            .clone()
            .map(LineRange::normalized)
            .unwrap_or_else(|| implicit_range(entry));

        match versions.iter_mut().find(|v| v.provider == entry.provider) {
            Some(version) => {
                version.content = entry.result_content().map(str::to_string);
                version.prior_content = entry.prior_content().map(str::to_string);
                version.range = range;
                version.last_op_id = entry.id;
                version.last_recorded_at = entry.recorded_at;
            }
            None => versions.push(ProviderVersion {
                provider: entry.provider.clone(),
                content: entry.result_content().map(str::to_string),
                prior_content: entry.prior_content().map(str::to_string),
                range,
                created: entry.kind() == OperationKind::Create,
                first_op_id: entry.id,
                first_recorded_at: entry.recorded_at,
                last_op_id: entry.id,
                last_recorded_at: entry.recorded_at,
            }),
        }
    }

    versions
}

/// Whole-file operations touch every line of whichever side is longer.
/// A delete with unknown prior content touches everything.
fn implicit_range(entry: &OperationRecord) -> LineRange {
    let lines = |c: Option<&str>| c.map(|c| c.lines().count());
    match (lines(entry.prior_content()), lines(entry.result_content())) {
        (None, None) => LineRange::new(0, usize::MAX),
        (a, b) => LineRange::new(0, a.unwrap_or(0).max(b.unwrap_or(0))),
    }
}

/// Providers whose range intersects at least one other provider's range.
fn overlapping_providers(versions: &[ProviderVersion]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for (i, a) in versions.iter().enumerate() {
        for b in &versions[i + 1..] {
            if a.range.overlaps(&b.range) {
                for p in [&a.provider, &b.provider] {
                    if !out.contains(p) {
                        out.push(p.clone());
                    }
                }
            }
        }
    }
    out
}

/// Starting content of the earliest newest-operation that carries one.
fn shared_base(versions: &[ProviderVersion]) -> Option<String> {
    versions
        .iter()
        .filter(|v| v.prior_content.is_some())
        .min_by_key(|v| v.last_op_id)
        .and_then(|v| v.prior_content.clone())
}
