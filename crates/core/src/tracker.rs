//! The tracker: single entry point for provider workers.
//!
//! All mutation for one path happens under that path's mutex, so History and
//! Ownership observe a path's operations in the same total order while
//! different paths proceed in parallel. The shared tables are held behind
//! `RwLock`s for short critical sections only, always in the order
//! path lock → history → ownership. Conflict resolution runs the equivalence
//! oracle on owned snapshots, outside every lock.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};

use crate::config::{AppConfig, MergeConfig};
use crate::conflict::resolver::{select_best_strategy, MergePlanEntry, ResolveOptions};
use crate::conflict::{
    Conflict, ConflictDetector, EquivalenceOracle, NormalizedTextOracle, Resolution, Strategy,
    StrategyResolver,
};
use crate::errors::{OwnershipError, StrategyError, TrackerError};
use crate::history::{HistoryLog, HistorySnapshot, OperationRecord};
use crate::models::{
    FileDiff, FileOperation, FileState, FileStatus, ListFilter, OperationKind, TrackOptions,
    TrackerStats,
};
use crate::ownership::OwnershipRegistry;

/// Coordinator over the history log, ownership registry, conflict detector,
/// and strategy resolver. Share it between workers with `Arc<Tracker>`.
pub struct Tracker {
    path_locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
    history: RwLock<HistoryLog>,
    ownership: RwLock<OwnershipRegistry>,
    resolver: StrategyResolver,
    merge: MergeConfig,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("merge", &self.merge)
            .finish_non_exhaustive()
    }
}

impl Tracker {
    pub fn new() -> Self {
        Self::with_oracle(Arc::new(NormalizedTextOracle))
    }

    /// Tracker that delegates structural comparison to `oracle`.
    pub fn with_oracle(oracle: Arc<dyn EquivalenceOracle>) -> Self {
        Self {
            path_locks: RwLock::new(HashMap::new()),
            history: RwLock::new(HistoryLog::new()),
            ownership: RwLock::new(OwnershipRegistry::new()),
            resolver: StrategyResolver::new(oracle),
            merge: MergeConfig::default(),
        }
    }

    /// Tracker using the `[merge]` section of `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new().with_merge_config(config.merge.clone())
    }

    pub fn with_merge_config(mut self, merge: MergeConfig) -> Self {
        self.merge = merge;
        self
    }

    pub fn merge_config(&self) -> &MergeConfig {
        &self.merge
    }

    fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            interactive: self.merge.interactive,
        }
    }

    // -----------------------------------------------------------------------
    // Lock helpers
    // -----------------------------------------------------------------------

    /// Mutex serializing every mutation of `path`.
    fn path_lock(&self, path: &str) -> Arc<Mutex<()>> {
        {
            let map = self.path_locks.read().unwrap_or_else(|poisoned| {
                warn!("path lock map was poisoned, recovering");
                poisoned.into_inner()
            });
            if let Some(lock) = map.get(path) {
                return Arc::clone(lock);
            }
        }

        let mut map = self.path_locks.write().unwrap_or_else(|poisoned| {
            warn!("path lock map was poisoned, recovering");
            poisoned.into_inner()
        });
        Arc::clone(
            map.entry(path.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// The path's mutex if a writer ever created one. Queries use this so
    /// reading an unknown path leaves the map untouched.
    fn existing_path_lock(&self, path: &str) -> Option<Arc<Mutex<()>>> {
        let map = self.path_locks.read().unwrap_or_else(|poisoned| {
            warn!("path lock map was poisoned, recovering");
            poisoned.into_inner()
        });
        map.get(path).map(Arc::clone)
    }

    fn serialize(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
        lock.lock().unwrap_or_else(|poisoned| {
            warn!("path mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn history(&self) -> RwLockReadGuard<'_, HistoryLog> {
        self.history.read().unwrap_or_else(|poisoned| {
            warn!("history lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn history_mut(&self) -> RwLockWriteGuard<'_, HistoryLog> {
        self.history.write().unwrap_or_else(|poisoned| {
            warn!("history lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn ownership(&self) -> RwLockReadGuard<'_, OwnershipRegistry> {
        self.ownership.read().unwrap_or_else(|poisoned| {
            warn!("ownership lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn ownership_mut(&self) -> RwLockWriteGuard<'_, OwnershipRegistry> {
        self.ownership.write().unwrap_or_else(|poisoned| {
            warn!("ownership lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    // -----------------------------------------------------------------------
    // Tracking
    // -----------------------------------------------------------------------

    /// Record an operation and update authorship in one serialized step.
    ///
    /// Total: content is stored as given, whatever it contains. The first
    /// provider to touch an unowned path becomes its owner, later ones its
    /// contributors.
    pub fn track_file_operation(
        &self,
        provider: &str,
        path: &str,
        operation: FileOperation,
        options: TrackOptions,
    ) -> OperationRecord {
        let lock = self.path_lock(path);
        let _serial = Self::serialize(&lock);

        let mut history = self.history_mut();
        let mut ownership = self.ownership_mut();
        let record = history.record(path, provider, operation, options.line_range);
        ownership.note_author(path, provider);

        info!(
            id = record.id,
            path,
            provider,
            kind = %record.kind(),
            "file operation tracked"
        );
        record
    }

    /// Derived status, or `None` for a path with no history.
    pub fn get_file_status(&self, path: &str) -> Option<FileStatus> {
        let lock = self.existing_path_lock(path);
        let _serial = lock.as_deref().map(Self::serialize);

        let history = self.history();
        let ownership = self.ownership();
        file_status(path, &history, &ownership)
    }

    /// Every tracked file, sorted by path, optionally only those a provider touched.
    pub fn list_files(&self, filter: &ListFilter) -> Vec<FileStatus> {
        let history = self.history();
        let ownership = self.ownership();
        history
            .paths()
            .iter()
            .filter(|path| match &filter.provider {
                Some(p) => history.entries_for(path).iter().any(|r| &r.provider == p),
                None => true,
            })
            .filter_map(|path| file_status(path, &history, &ownership))
            .collect()
    }

    /// Unified diff from the file's original content (empty for a create) to
    /// its current version (empty after a delete).
    pub fn get_file_diff(&self, path: &str) -> Result<FileDiff, TrackerError> {
        let (original, current) = {
            let lock = self.existing_path_lock(path);
            let _serial = lock.as_deref().map(Self::serialize);
            let history = self.history();
            let entries = history.entries_for(path);
            let (Some(first), Some(last)) = (entries.first(), entries.last()) else {
                return Err(TrackerError::NotFound(path.to_string()));
            };
            (
                first.prior_content().unwrap_or_default().to_string(),
                last.result_content().unwrap_or_default().to_string(),
            )
        };

        let patch = diffy::create_patch(&original, &current);
        let (mut additions, mut deletions) = (0, 0);
        for hunk in patch.hunks() {
            for line in hunk.lines() {
                match line {
                    diffy::Line::Insert(_) => additions += 1,
                    diffy::Line::Delete(_) => deletions += 1,
                    diffy::Line::Context(_) => {}
                }
            }
        }

        Ok(FileDiff {
            path: path.to_string(),
            patch: patch.to_string(),
            additions,
            deletions,
        })
    }

    // -----------------------------------------------------------------------
    // History queries
    // -----------------------------------------------------------------------

    pub fn get_file_history(&self, path: &str) -> Vec<OperationRecord> {
        let lock = self.existing_path_lock(path);
        let _serial = lock.as_deref().map(Self::serialize);
        self.history().file_history(path)
    }

    pub fn get_provider_history(&self, provider: &str) -> Vec<OperationRecord> {
        self.history().provider_history(provider)
    }

    pub fn get_current_version(&self, path: &str) -> Option<String> {
        let lock = self.existing_path_lock(path);
        let _serial = lock.as_deref().map(Self::serialize);
        self.history().current_version(path)
    }

    /// Content stored by history entry `id`. Nothing is recorded; track a
    /// modify with the returned content to persist the revert.
    pub fn revert_to_version(&self, path: &str, id: u64) -> Result<Option<String>, TrackerError> {
        let lock = self.existing_path_lock(path);
        let _serial = lock.as_deref().map(Self::serialize);
        Ok(self.history().revert_to_version(path, id)?)
    }

    // -----------------------------------------------------------------------
    // Ownership
    // -----------------------------------------------------------------------

    pub fn assign_owner(&self, path: &str, provider: &str) -> Result<(), OwnershipError> {
        let lock = self.path_lock(path);
        let _serial = Self::serialize(&lock);
        self.ownership_mut().assign_owner(path, provider)
    }

    pub fn transfer_ownership(&self, path: &str, new_owner: &str) -> Result<(), OwnershipError> {
        let lock = self.path_lock(path);
        let _serial = Self::serialize(&lock);
        self.ownership_mut().transfer_ownership(path, new_owner)
    }

    /// `false` when the provider owns the file or is already a contributor.
    pub fn add_contributor(&self, path: &str, provider: &str) -> bool {
        let lock = self.path_lock(path);
        let _serial = Self::serialize(&lock);
        self.ownership_mut().add_contributor(path, provider)
    }

    pub fn get_owner(&self, path: &str) -> Option<String> {
        self.ownership().owner(path)
    }

    pub fn get_contributors(&self, path: &str) -> Vec<String> {
        self.ownership().contributors(path)
    }

    pub fn get_owned_files(&self, provider: &str) -> Vec<String> {
        self.ownership().owned_files(provider)
    }

    // -----------------------------------------------------------------------
    // Locks
    // -----------------------------------------------------------------------

    /// Advisory lock. Returns immediately with `Locked` when held.
    pub fn lock_file(&self, path: &str, provider: &str) -> Result<(), OwnershipError> {
        let lock = self.path_lock(path);
        let _serial = Self::serialize(&lock);
        self.ownership_mut().lock_file(path, provider)
    }

    pub fn unlock_file(&self, path: &str, provider: &str) -> Result<(), OwnershipError> {
        let lock = self.path_lock(path);
        let _serial = Self::serialize(&lock);
        self.ownership_mut().unlock_file(path, provider)
    }

    pub fn get_lock_holder(&self, path: &str) -> Option<String> {
        self.ownership().lock_holder(path)
    }

    pub fn is_locked(&self, path: &str) -> bool {
        self.ownership().is_locked(path)
    }

    /// `(path, holder)` for every locked file, sorted by path.
    pub fn get_locked_files(&self) -> Vec<(String, String)> {
        self.ownership().locked_files()
    }

    // -----------------------------------------------------------------------
    // Conflicts
    // -----------------------------------------------------------------------

    /// Classification of `path` of any kind, additions included.
    pub fn classify(&self, path: &str) -> Option<Conflict> {
        let lock = self.existing_path_lock(path);
        let _serial = lock.as_deref().map(Self::serialize);
        ConflictDetector::detect(path, self.history().entries_for(path))
    }

    /// Classifications of every tracked path, sorted by path.
    pub fn classify_all(&self) -> Vec<Conflict> {
        let history = self.history();
        history
            .paths()
            .iter()
            .filter_map(|path| ConflictDetector::detect(path, history.entries_for(path)))
            .collect()
    }

    /// Blocking (file-level and line-level) conflicts across all paths.
    pub fn list_conflicts(&self) -> Vec<Conflict> {
        self.classify_all()
            .into_iter()
            .filter(Conflict::is_blocking)
            .collect()
    }

    /// The blocking conflict on `path`, if there is one.
    pub fn get_conflict(&self, path: &str) -> Option<Conflict> {
        self.classify(path).filter(Conflict::is_blocking)
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Resolve with a named strategy, honouring the configured `interactive` flag.
    pub fn resolve_conflicts(
        &self,
        conflicts: &[Conflict],
        strategy: &str,
    ) -> Result<BTreeMap<String, Resolution>, StrategyError> {
        self.resolver
            .resolve_conflicts(conflicts, strategy, self.resolve_options())
    }

    /// Resolve raw per-provider contents, given in recording order.
    pub fn apply_strategy(
        &self,
        path: &str,
        contents: &[(String, String)],
        strategy: &str,
    ) -> Result<String, StrategyError> {
        self.resolver
            .apply_strategy(path, contents, strategy, self.resolve_options())
    }

    pub fn create_merge_plan(
        &self,
        conflicts: &[Conflict],
        strategy: Strategy,
    ) -> Vec<MergePlanEntry> {
        self.resolver.create_merge_plan(conflicts, strategy)
    }

    /// Strategy for `path`: a configured override, else `explicit`, else the
    /// configured default, else `fallback`.
    pub fn strategy_for(
        &self,
        path: &str,
        explicit: Option<Strategy>,
        fallback: Strategy,
    ) -> Result<Strategy, StrategyError> {
        if let Some(strategy) = self.merge.override_for(path)? {
            return Ok(strategy);
        }
        if let Some(strategy) = explicit {
            return Ok(strategy);
        }
        Ok(self.merge.default_strategy()?.unwrap_or(fallback))
    }

    /// Merge-all workflow: classify every path (additions included) and
    /// resolve each with its chosen strategy.
    ///
    /// Only an unknown `strategy` name fails the call; everything else,
    /// including manual resolutions, is reported per path.
    pub fn resolve_all(
        &self,
        strategy: Option<&str>,
    ) -> Result<BTreeMap<String, Resolution>, StrategyError> {
        let explicit = strategy.map(str::parse::<Strategy>).transpose()?;
        let conflicts = self.classify_all();
        let fallback = select_best_strategy(&conflicts);
        let options = self.resolve_options();

        let mut out = BTreeMap::new();
        for conflict in &conflicts {
            let resolution = match self.strategy_for(&conflict.path, explicit, fallback) {
                Ok(chosen) => self.resolver.resolve(conflict, chosen, options),
                Err(e) => {
                    warn!(path = %conflict.path, error = %e, "strategy lookup failed");
                    Resolution::ManualRequired {
                        reason: e.to_string(),
                    }
                }
            };
            out.insert(conflict.path.clone(), resolution);
        }
        info!(files = out.len(), fallback = %fallback, "merge-all complete");
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn save_history(&self, path: &Path) -> Result<(), TrackerError> {
        let snapshot = self.history().snapshot();
        snapshot.save(path)?;
        Ok(())
    }

    /// Replace all state with a saved history. Ownership and contributors are
    /// rebuilt by replaying authorship in id order; locks start released.
    pub fn load_history(&self, path: &Path) -> Result<usize, TrackerError> {
        let snapshot = HistorySnapshot::load(path)?;
        Ok(self.restore(snapshot))
    }

    /// Replace all state with `snapshot`. Returns the number of entries restored.
    pub fn restore(&self, snapshot: HistorySnapshot) -> usize {
        let mut history = self.history_mut();
        let mut ownership = self.ownership_mut();
        history.restore(snapshot);
        ownership.clear();

        let mut entries: Vec<&OperationRecord> = history.all_entries().collect();
        entries.sort_by_key(|r| r.id);
        for record in &entries {
            ownership.note_author(&record.path, &record.provider);
        }
        info!(entries = entries.len(), "history restored");
        entries.len()
    }

    // -----------------------------------------------------------------------
    // Aggregates
    // -----------------------------------------------------------------------

    pub fn get_stats(&self) -> TrackerStats {
        let (history_stats, providers, operations_by_kind, conflicts) = {
            let history = self.history();
            let mut by_kind: BTreeMap<OperationKind, usize> = BTreeMap::new();
            for record in history.all_entries() {
                *by_kind.entry(record.kind()).or_default() += 1;
            }
            let conflicts = history
                .paths()
                .iter()
                .filter_map(|p| ConflictDetector::detect(p, history.entries_for(p)))
                .filter(Conflict::is_blocking)
                .count();
            (history.stats(), history.providers().len(), by_kind, conflicts)
        };
        let ownership = self.ownership();

        TrackerStats {
            total_operations: history_stats.total_entries,
            files_tracked: history_stats.files_tracked,
            providers,
            owned_files: ownership.owned_count(),
            locked_files: ownership.locked_files().len(),
            conflicts,
            operations_by_kind,
        }
    }

    /// Clear history, ownership, and locks.
    pub fn reset(&self) {
        let mut history = self.history_mut();
        let mut ownership = self.ownership_mut();
        history.clear();
        ownership.clear();
        drop(ownership);
        drop(history);

        let mut locks = self.path_locks.write().unwrap_or_else(|poisoned| {
            warn!("path lock map was poisoned, recovering");
            poisoned.into_inner()
        });
        // Mutexes still held by an in-flight call stay so that call keeps
        // excluding newcomers on the same path.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        info!("tracker reset");
    }
}

fn file_status(
    path: &str,
    history: &HistoryLog,
    ownership: &OwnershipRegistry,
) -> Option<FileStatus> {
    let entries = history.entries_for(path);
    let last = entries.last()?;
    let status = match entries {
        [only] if only.kind() == OperationKind::Create => FileState::New,
        _ => FileState::Modified,
    };
    let record = ownership.record(path);

    Some(FileStatus {
        path: path.to_string(),
        owner: record.and_then(|r| r.owner.clone()),
        status,
        contributors: record
            .map(|r| r.contributors.iter().cloned().collect())
            .unwrap_or_default(),
        locked_by: record.and_then(|r| r.lock_holder.clone()),
        operations: entries.len(),
        last_provider: last.provider.clone(),
    })
}
