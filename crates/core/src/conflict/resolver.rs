//! Merge strategy resolution.
//!
//! The [`StrategyResolver`] turns a [`Conflict`] and a [`Strategy`] into a
//! [`Resolution`]: accept one provider, a computed merge, or a request for
//! manual intervention. Every strategy is total over its input; only strategy
//! name parsing and interactive `manual` requests surface as errors, and
//! batch resolution keeps those local to the file.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::conflict::detector::{Conflict, ConflictKind, ProviderVersion};
use crate::conflict::merger::Merger;
use crate::conflict::scope::scope_of;
use crate::conflict::semantic::{all_equivalent, EquivalenceOracle, Language, NormalizedTextOracle};
use crate::errors::StrategyError;
use crate::models::LineRange;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Named merge strategies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    LastWriteWins,
    FirstWriteWins,
    Union,
    Intersection,
    Semantic,
    Auto,
    Manual,
}

impl Strategy {
    pub const ALL: [Strategy; 7] = [
        Self::LastWriteWins,
        Self::FirstWriteWins,
        Self::Union,
        Self::Intersection,
        Self::Semantic,
        Self::Auto,
        Self::Manual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LastWriteWins => "last_write_wins",
            Self::FirstWriteWins => "first_write_wins",
            Self::Union => "union",
            Self::Intersection => "intersection",
            Self::Semantic => "semantic",
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Strategy {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| StrategyError::UnknownStrategy(s.to_string()))
    }
}

/// Outcome for one conflicted path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resolution {
    /// Take one provider's version as-is. `content` is `None` when that
    /// provider's latest operation deleted the file.
    Accept {
        provider: String,
        content: Option<String>,
    },
    /// Computed content. A `semantic` merge flags that a deeper, strategy
    /// specific merge is still required before writing.
    Merge { strategy: Strategy, content: String },
    /// A person has to decide.
    ManualRequired { reason: String },
}

impl Resolution {
    pub fn label(&self) -> String {
        match self {
            Self::Accept { provider, .. } => format!("accept {}", provider),
            Self::Merge { strategy, .. } => format!("merge ({})", strategy),
            Self::ManualRequired { .. } => "manual".to_string(),
        }
    }

    /// Content to write, or `None` for manual resolutions and accepted deletes.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Accept { content, .. } => content.as_deref(),
            Self::Merge { content, .. } => Some(content),
            Self::ManualRequired { .. } => None,
        }
    }
}

/// Options shared by every resolution call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// When false, `manual` falls back to `auto` so batch runs make progress.
    pub interactive: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { interactive: true }
    }
}

/// One line of a merge plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MergePlanEntry {
    pub path: String,
    pub strategy: Strategy,
    pub description: String,
}

/// Steps tried by `auto`, in order. The first step that yields a resolution wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoStep {
    /// Accept a representative when the oracle reports all versions equivalent.
    Semantic,
    /// Union when the conflict is an addition or its ranges are disjoint.
    Union,
    /// Always yields a manual resolution.
    Manual,
}

pub const AUTO_CASCADE: [AutoStep; 3] = [AutoStep::Semantic, AutoStep::Union, AutoStep::Manual];

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Applies strategies to conflicts, consulting an equivalence oracle for
/// `semantic` and `auto`.
#[derive(Clone)]
pub struct StrategyResolver {
    oracle: Arc<dyn EquivalenceOracle>,
}

impl std::fmt::Debug for StrategyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyResolver").finish_non_exhaustive()
    }
}

impl Default for StrategyResolver {
    fn default() -> Self {
        Self::new(Arc::new(NormalizedTextOracle))
    }
}

impl StrategyResolver {
    pub fn new(oracle: Arc<dyn EquivalenceOracle>) -> Self {
        Self { oracle }
    }

    /// Resolve every conflict with the named strategy.
    ///
    /// Fails as a whole only for an unknown strategy name. Files that need
    /// manual attention come back as [`Resolution::ManualRequired`].
    pub fn resolve_conflicts(
        &self,
        conflicts: &[Conflict],
        strategy: &str,
        options: ResolveOptions,
    ) -> Result<BTreeMap<String, Resolution>, StrategyError> {
        let strategy: Strategy = strategy.parse()?;
        info!(strategy = %strategy, count = conflicts.len(), "resolving conflicts");
        Ok(conflicts
            .iter()
            .map(|c| (c.path.clone(), self.resolve(c, strategy, options)))
            .collect())
    }

    /// Resolve one conflict. Total: always produces a resolution.
    pub fn resolve(
        &self,
        conflict: &Conflict,
        strategy: Strategy,
        options: ResolveOptions,
    ) -> Resolution {
        let resolution = match strategy {
            Strategy::LastWriteWins => last_write_wins(conflict),
            Strategy::FirstWriteWins => first_write_wins(conflict),
            Strategy::Union => union(conflict),
            Strategy::Intersection => intersection(conflict),
            Strategy::Semantic => self.semantic(conflict),
            Strategy::Auto => self.auto(conflict),
            Strategy::Manual if options.interactive => Resolution::ManualRequired {
                reason: format!("manual strategy requested for {} conflict", conflict.kind),
            },
            Strategy::Manual => {
                warn!(
                    path = %conflict.path,
                    "manual strategy in non-interactive mode, falling back to auto",
                );
                self.auto(conflict)
            }
        };
        debug!(
            path = %conflict.path,
            strategy = %strategy,
            resolution = %resolution.label(),
            "conflict resolved"
        );
        resolution
    }

    /// Resolve raw per-provider contents, given in recording order, to a
    /// single content.
    pub fn apply_strategy(
        &self,
        path: &str,
        contents: &[(String, String)],
        strategy: &str,
        options: ResolveOptions,
    ) -> Result<String, StrategyError> {
        let strategy: Strategy = strategy.parse()?;
        let conflict = conflict_from_contents(path, contents);
        match self.resolve(&conflict, strategy, options) {
            Resolution::ManualRequired { .. } => {
                Err(StrategyError::ManualResolutionRequired(path.to_string()))
            }
            resolution => Ok(resolution.content().unwrap_or_default().to_string()),
        }
    }

    /// Describe what `strategy` would do for each conflict without running the oracle.
    pub fn create_merge_plan(
        &self,
        conflicts: &[Conflict],
        strategy: Strategy,
    ) -> Vec<MergePlanEntry> {
        conflicts
            .iter()
            .map(|c| MergePlanEntry {
                path: c.path.clone(),
                strategy,
                description: describe(c, strategy),
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Oracle-backed strategies
    // -----------------------------------------------------------------------

    /// Equivalence verdict across two or more contending versions. A deleted
    /// version is never equivalent to anything.
    fn equivalence(&self, conflict: &Conflict) -> Option<bool> {
        if conflict.versions.len() < 2 {
            return None;
        }
        if conflict.versions.iter().any(|v| v.content.is_none()) {
            return Some(false);
        }
        let contents: Vec<&str> = conflict.contents().into_iter().map(|(_, c)| c).collect();
        all_equivalent(self.oracle.as_ref(), &contents, Language::from_path(&conflict.path))
    }

    fn semantic(&self, conflict: &Conflict) -> Resolution {
        if let [only] = conflict.versions.as_slice() {
            return accept(only);
        }
        if self.equivalence(conflict) == Some(true) {
            if let Some(representative) = earliest(conflict) {
                return accept(representative);
            }
        }
        Resolution::Merge {
            strategy: Strategy::Semantic,
            content: latest(conflict)
                .and_then(|v| v.content.clone())
                .unwrap_or_default(),
        }
    }

    fn auto(&self, conflict: &Conflict) -> Resolution {
        AUTO_CASCADE
            .iter()
            .find_map(|step| self.attempt(*step, conflict))
            .unwrap_or_else(|| Resolution::ManualRequired {
                reason: "no automatic strategy applies".to_string(),
            })
    }

    /// Run one cascade step; `None` passes to the next.
    pub fn attempt(&self, step: AutoStep, conflict: &Conflict) -> Option<Resolution> {
        match step {
            AutoStep::Semantic => match (self.equivalence(conflict), earliest(conflict)) {
                (Some(true), Some(representative)) => Some(accept(representative)),
                _ => None,
            },
            AutoStep::Union => (conflict.kind == ConflictKind::Addition
                || (conflict.kind == ConflictKind::LineLevel && conflict.has_disjoint_ranges()))
            .then(|| union(conflict)),
            AutoStep::Manual => Some(Resolution::ManualRequired {
                reason: format!(
                    "{} conflict between {}",
                    conflict.kind,
                    conflict.providers.join(", "),
                ),
            }),
        }
    }
}

/// Heuristic used when no strategy is given.
///
/// `union` when every conflict is an addition, `semantic` when every
/// line-level conflict's providers work in distinct scopes, `manual` when
/// some line-level conflict shares or lacks a scope, `auto` otherwise.
pub fn select_best_strategy(conflicts: &[Conflict]) -> Strategy {
    if conflicts.iter().all(|c| c.kind == ConflictKind::Addition) {
        return Strategy::Union;
    }

    let line_level: Vec<&Conflict> = conflicts
        .iter()
        .filter(|c| c.kind == ConflictKind::LineLevel)
        .collect();

    if !line_level.is_empty() && line_level.iter().all(|c| distinct_scopes(c)) {
        return Strategy::Semantic;
    }
    if !line_level.is_empty() {
        return Strategy::Manual;
    }
    Strategy::Auto
}

/// Every version names a scope and no two names coincide.
fn distinct_scopes(conflict: &Conflict) -> bool {
    let scopes: Vec<Option<String>> = conflict.versions.iter().map(scope_of).collect();
    if scopes.iter().any(Option::is_none) {
        return false;
    }
    let mut names: Vec<&String> = scopes.iter().flatten().collect();
    names.sort();
    names.dedup();
    names.len() == scopes.len()
}

// ---------------------------------------------------------------------------
// Strategy implementations
// ---------------------------------------------------------------------------

fn accept(version: &ProviderVersion) -> Resolution {
    Resolution::Accept {
        provider: version.provider.clone(),
        content: version.content.clone(),
    }
}

fn empty_merge(strategy: Strategy) -> Resolution {
    Resolution::Merge {
        strategy,
        content: String::new(),
    }
}

/// Version whose newest operation was recorded last.
fn latest(conflict: &Conflict) -> Option<&ProviderVersion> {
    conflict
        .versions
        .iter()
        .max_by_key(|v| (v.last_recorded_at, v.last_op_id))
}

/// Version whose first operation was recorded first.
fn earliest(conflict: &Conflict) -> Option<&ProviderVersion> {
    conflict
        .versions
        .iter()
        .min_by_key(|v| (v.first_recorded_at, v.first_op_id))
}

fn last_write_wins(conflict: &Conflict) -> Resolution {
    latest(conflict)
        .map(accept)
        .unwrap_or_else(|| empty_merge(Strategy::LastWriteWins))
}

fn first_write_wins(conflict: &Conflict) -> Resolution {
    earliest(conflict)
        .map(accept)
        .unwrap_or_else(|| empty_merge(Strategy::FirstWriteWins))
}

/// Range-preserving three-way fold when the ranges are disjoint and a base is
/// known, otherwise order-preserving line union.
fn union(conflict: &Conflict) -> Resolution {
    let contents: Vec<&str> = conflict.contents().into_iter().map(|(_, c)| c).collect();

    let content = match contents.as_slice() {
        [] => String::new(),
        [only] => only.to_string(),
        _ => conflict
            .base
            .as_deref()
            .filter(|_| conflict.has_disjoint_ranges())
            .and_then(|base| Merger::fold_three_way(base, &contents))
            .unwrap_or_else(|| Merger::line_union(&contents)),
    };

    Resolution::Merge {
        strategy: Strategy::Union,
        content,
    }
}

fn intersection(conflict: &Conflict) -> Resolution {
    let content = if conflict.versions.iter().any(|v| v.content.is_none()) {
        String::new()
    } else {
        let contents: Vec<&str> = conflict.contents().into_iter().map(|(_, c)| c).collect();
        Merger::line_intersection(&contents)
    };
    Resolution::Merge {
        strategy: Strategy::Intersection,
        content,
    }
}

fn describe(conflict: &Conflict, strategy: Strategy) -> String {
    let providers = conflict.providers.join(", ");
    match strategy {
        Strategy::LastWriteWins => match latest(conflict) {
            Some(v) => format!("accept {} (most recent write)", v.provider),
            None => "nothing to accept".to_string(),
        },
        Strategy::FirstWriteWins => match earliest(conflict) {
            Some(v) => format!("accept {} (earliest write)", v.provider),
            None => "nothing to accept".to_string(),
        },
        Strategy::Union if conflict.base.is_some() && conflict.has_disjoint_ranges() => {
            format!("three-way merge of disjoint edits from {}", providers)
        }
        Strategy::Union => format!("union of distinct lines from {}", providers),
        Strategy::Intersection => format!("keep lines common to {}", providers),
        Strategy::Semantic => format!(
            "compare {} structure of {}; accept one if equivalent",
            Language::from_path(&conflict.path),
            providers
        ),
        Strategy::Auto => match conflict.kind {
            ConflictKind::Addition => format!("union of additions from {}", providers),
            _ => format!("semantic check, else manual review of {}", providers),
        },
        Strategy::Manual => format!(
            "manual review of {} conflict between {}",
            conflict.kind,
            providers,
        ),
    }
}

/// Synthetic conflict over raw contents. Recording order comes from the
/// slice order; one provider is an addition, more are a file-level clash.
fn conflict_from_contents(path: &str, contents: &[(String, String)]) -> Conflict {
    let base_time = chrono::Utc::now();
    let versions: Vec<ProviderVersion> = contents
        .iter()
        .enumerate()
        .map(|(i, (provider, content))| {
            let id = i as u64 + 1;
            let at = base_time + chrono::Duration::microseconds(i as i64);
            ProviderVersion {
                provider: provider.clone(),
                content: Some(content.clone()),
                prior_content: None,
                range: LineRange::whole(content),
                created: true,
                first_op_id: id,
                first_recorded_at: at,
                last_op_id: id,
                last_recorded_at: at,
            }
        })
        .collect();

    let mut providers: Vec<String> = versions.iter().map(|v| v.provider.clone()).collect();
    providers.sort();

    Conflict {
        path: path.to_string(),
        kind: if versions.len() <= 1 {
            ConflictKind::Addition
        } else {
            ConflictKind::FileLevel
        },
        providers,
        versions,
        base: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::detector::ConflictDetector;
    use crate::history::HistoryLog;
    use crate::models::FileOperation;

    fn contents(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect()
    }

    fn resolver() -> StrategyResolver {
        StrategyResolver::default()
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!("union".parse::<Strategy>(), Ok(Strategy::Union));
        assert_eq!(
            "unknown_strategy".parse::<Strategy>(),
            Err(StrategyError::UnknownStrategy("unknown_strategy".into()))
        );
        for s in Strategy::ALL {
            assert_eq!(s.as_str().parse::<Strategy>(), Ok(s));
        }
    }

    #[test]
    fn test_write_order_strategies() {
        let c = contents(&[("A", "v1"), ("B", "v2"), ("C", "v3")]);
        let r = resolver();
        let opts = ResolveOptions::default();
        assert_eq!(r.apply_strategy("f", &c, "last_write_wins", opts).unwrap(), "v3");
        assert_eq!(r.apply_strategy("f", &c, "first_write_wins", opts).unwrap(), "v1");
    }

    #[test]
    fn test_unknown_strategy_is_error() {
        let c = contents(&[("A", "v1")]);
        assert_eq!(
            resolver().apply_strategy("f", &c, "unknown_strategy", ResolveOptions::default()),
            Err(StrategyError::UnknownStrategy("unknown_strategy".into()))
        );
    }

    #[test]
    fn test_manual_interactive_vs_batch() {
        let c = contents(&[("A", "a\n"), ("B", "b\n")]);
        let r = resolver();
        assert_eq!(
            r.apply_strategy("f.rs", &c, "manual", ResolveOptions { interactive: true }),
            Err(StrategyError::ManualResolutionRequired("f.rs".into()))
        );
        // Non-interactive manual runs auto, which cannot settle a file-level clash.
        assert!(r
            .apply_strategy("f.rs", &c, "manual", ResolveOptions { interactive: false })
            .is_err());

        let same = contents(&[("A", "x = 1\n"), ("B", "x = 1  \n")]);
        assert_eq!(
            r.apply_strategy("f.py", &same, "manual", ResolveOptions { interactive: false }),
            Ok("x = 1\n".to_string())
        );
    }

    #[test]
    fn test_union_and_intersection_contents() {
        let c = contents(&[("A", "a\nb\n"), ("B", "b\nc\n")]);
        let r = resolver();
        let opts = ResolveOptions::default();
        assert_eq!(r.apply_strategy("f", &c, "union", opts).unwrap(), "a\nb\nc\n");
        assert_eq!(r.apply_strategy("f", &c, "intersection", opts).unwrap(), "b\n");
    }

    #[test]
    fn test_degenerate_inputs_are_total() {
        let r = resolver();
        let opts = ResolveOptions::default();
        for s in ["last_write_wins", "first_write_wins", "union", "intersection", "semantic"] {
            assert_eq!(r.apply_strategy("f", &[], s, opts).unwrap(), "");
        }
        let single = contents(&[("A", "only\n")]);
        for s in [
            "last_write_wins",
            "first_write_wins",
            "union",
            "intersection",
            "semantic",
            "auto",
        ] {
            assert_eq!(r.apply_strategy("f", &single, s, opts).unwrap(), "only\n");
        }
    }

    #[test]
    fn test_semantic_equivalent_accepts_representative() {
        let mut log = HistoryLog::new();
        log.record("a.rs", "p1", FileOperation::create("fn a() {}\n"), None);
        log.record("a.rs", "p2", FileOperation::create("// same\nfn a() {}\n"), None);
        let conflict = ConflictDetector::detect("a.rs", log.entries_for("a.rs")).unwrap();
        let resolution = resolver().resolve(
            &conflict,
            Strategy::Semantic,
            ResolveOptions::default(),
        );
        assert_eq!(
            resolution,
            Resolution::Accept {
                provider: "p1".into(),
                content: Some("fn a() {}\n".into())
            }
        );
    }

    #[test]
    fn test_semantic_different_flags_merge() {
        let mut log = HistoryLog::new();
        log.record("a.rs", "p1", FileOperation::create("fn a() {}\n"), None);
        log.record("a.rs", "p2", FileOperation::create("fn b() {}\n"), None);
        let conflict = ConflictDetector::detect("a.rs", log.entries_for("a.rs")).unwrap();
        let resolution = resolver().resolve(
            &conflict,
            Strategy::Semantic,
            ResolveOptions::default(),
        );
        assert_eq!(
            resolution,
            Resolution::Merge {
                strategy: Strategy::Semantic,
                content: "fn b() {}\n".into()
            }
        );
    }

    #[test]
    fn test_auto_cascade_steps() {
        let mut log = HistoryLog::new();
        log.record("new.ex", "p1", FileOperation::create("defmodule New do\nend\n"), None);
        let addition = ConflictDetector::detect("new.ex", log.entries_for("new.ex")).unwrap();
        let r = resolver();

        assert_eq!(r.attempt(AutoStep::Semantic, &addition), None);
        assert!(r.attempt(AutoStep::Union, &addition).is_some());
        assert!(matches!(
            r.attempt(AutoStep::Manual, &addition),
            Some(Resolution::ManualRequired { .. })
        ));

        log.record("x.ex", "p1", FileOperation::create("a"), None);
        log.record("x.ex", "p2", FileOperation::create("b"), None);
        let clash = ConflictDetector::detect("x.ex", log.entries_for("x.ex")).unwrap();
        assert_eq!(r.attempt(AutoStep::Semantic, &clash), None);
        assert_eq!(r.attempt(AutoStep::Union, &clash), None);
        assert!(matches!(
            r.resolve(&clash, Strategy::Auto, ResolveOptions::default()),
            Resolution::ManualRequired { .. }
        ));
    }

    #[test]
    fn test_auto_on_single_provider_is_union() {
        let mut log = HistoryLog::new();
        log.record("lib/y.ex", "p1", FileOperation::create("a\n"), None);
        log.record("lib/y.ex", "p1", FileOperation::modify("a\n", "a\nb\n"), None);
        let conflict = ConflictDetector::detect("lib/y.ex", log.entries_for("lib/y.ex")).unwrap();

        let r = resolver();
        assert_eq!(
            r.resolve(&conflict, Strategy::Auto, ResolveOptions::default()),
            Resolution::Merge {
                strategy: Strategy::Union,
                content: "a\nb\n".into()
            }
        );
    }

    #[test]
    fn test_union_folds_disjoint_edits() {
        let base = "a\nb\nc\nd\ne\nf\ng\nh\n";
        let mut log = HistoryLog::new();
        log.record(
            "m.py",
            "p1",
            FileOperation::modify(base, "A\nb\nc\nd\ne\nf\ng\nh\n"),
            Some(LineRange::new(0, 1)),
        );
        log.record(
            "m.py",
            "p2",
            FileOperation::modify(base, "a\nb\nc\nd\ne\nf\ng\nH\n"),
            Some(LineRange::new(7, 8)),
        );
        let conflict = ConflictDetector::detect("m.py", log.entries_for("m.py")).unwrap();
        assert_eq!(conflict.kind, ConflictKind::Addition);
        assert_eq!(
            union(&conflict),
            Resolution::Merge {
                strategy: Strategy::Union,
                content: "A\nb\nc\nd\ne\nf\ng\nH\n".into()
            }
        );
    }

    #[test]
    fn test_accept_deleted_version() {
        let mut log = HistoryLog::new();
        log.record("gone.rs", "p1", FileOperation::create("x\n"), None);
        log.record("gone.rs", "p2", FileOperation::delete("x\n"), None);
        let conflict = ConflictDetector::detect("gone.rs", log.entries_for("gone.rs")).unwrap();
        assert_eq!(
            last_write_wins(&conflict),
            Resolution::Accept {
                provider: "p2".into(),
                content: None
            }
        );
        assert_eq!(intersection(&conflict).content(), Some(""));
    }

    #[test]
    fn test_resolve_conflicts_keeps_failures_local() {
        let mut log = HistoryLog::new();
        log.record("a", "p1", FileOperation::create("1"), None);
        log.record("a", "p2", FileOperation::create("2"), None);
        log.record("b", "p1", FileOperation::create("3"), None);
        let conflicts: Vec<Conflict> = ["a", "b"]
            .iter()
            .filter_map(|p| ConflictDetector::detect(p, log.entries_for(p)))
            .collect();

        let r = resolver();
        let out = r.resolve_conflicts(&conflicts, "auto", ResolveOptions::default()).unwrap();
        assert!(matches!(out["a"], Resolution::ManualRequired { .. }));
        assert!(matches!(out["b"], Resolution::Accept { .. } | Resolution::Merge { .. }));

        assert_eq!(
            r.resolve_conflicts(&conflicts, "nope", ResolveOptions::default()),
            Err(StrategyError::UnknownStrategy("nope".into()))
        );
    }

    #[test]
    fn test_select_best_strategy() {
        let mut log = HistoryLog::new();
        log.record("add.rs", "p1", FileOperation::create("x"), None);
        let addition = ConflictDetector::detect("add.rs", log.entries_for("add.rs")).unwrap();
        assert_eq!(select_best_strategy(&[addition.clone()]), Strategy::Union);
        assert_eq!(select_best_strategy(&[]), Strategy::Union);

        let base = "fn a() {\n    1\n}\nfn b() {\n    2\n}\n";
        log.record(
            "s.rs",
            "p1",
            FileOperation::modify(base, base),
            Some(LineRange::new(0, 4).with_scope("a")),
        );
        log.record(
            "s.rs",
            "p2",
            FileOperation::modify(base, base),
            Some(LineRange::new(3, 6).with_scope("b")),
        );
        let scoped = ConflictDetector::detect("s.rs", log.entries_for("s.rs")).unwrap();
        assert_eq!(scoped.kind, ConflictKind::LineLevel);
        assert_eq!(select_best_strategy(&[addition.clone(), scoped]), Strategy::Semantic);

        log.record("t.rs", "p1", FileOperation::modify(base, base), Some(LineRange::new(1, 2)));
        log.record("t.rs", "p2", FileOperation::modify(base, base), Some(LineRange::new(0, 3)));
        let same_scope = ConflictDetector::detect("t.rs", log.entries_for("t.rs")).unwrap();
        assert_eq!(select_best_strategy(&[same_scope]), Strategy::Manual);

        log.record("u.rs", "p1", FileOperation::create("1"), None);
        log.record("u.rs", "p2", FileOperation::create("2"), None);
        let file_level = ConflictDetector::detect("u.rs", log.entries_for("u.rs")).unwrap();
        assert_eq!(select_best_strategy(&[addition, file_level]), Strategy::Auto);
    }

    #[test]
    fn test_merge_plan_descriptions() {
        let mut log = HistoryLog::new();
        log.record("lib/x.ex", "p1", FileOperation::create("a"), None);
        log.record("lib/x.ex", "p2", FileOperation::create("b"), None);
        let conflict = ConflictDetector::detect("lib/x.ex", log.entries_for("lib/x.ex")).unwrap();
        let plan = resolver().create_merge_plan(&[conflict], Strategy::LastWriteWins);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].path, "lib/x.ex");
        assert_eq!(plan[0].description, "accept p2 (most recent write)");
    }
}
