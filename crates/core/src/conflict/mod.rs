//! Conflict detection, merging, and strategy resolution.
//!
//! The conflict subsystem is responsible for:
//! 1. **Detection** -- classifying a path's history into file-level, line-level, or addition.
//! 2. **Merging** -- three-way folds, line union, and line intersection over contents.
//! 3. **Resolution** -- applying a named strategy, or picking one, per conflict.

pub mod detector;
pub mod merger;
pub mod resolver;
pub mod scope;
pub mod semantic;

pub use detector::{Conflict, ConflictDetector, ConflictKind, ProviderVersion};
pub use merger::{MergeResult, Merger};
pub use resolver::{
    select_best_strategy, MergePlanEntry, Resolution, ResolveOptions, Strategy, StrategyResolver,
};
pub use semantic::{EquivalenceOracle, Language, NormalizedTextOracle};
