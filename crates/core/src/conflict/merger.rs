//! Text-level merge primitives used by the strategy resolver.
//!
//! Three-way merges use the `diffy` crate: a patch from the shared base to
//! one side is applied to the other side, in both directions. Line union and
//! line intersection work on whole contents with no base.

use std::collections::HashSet;

use tracing::debug;

/// The result of a three-way merge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// Merged content. Equal to `ours` when `has_conflicts` is true.
    pub merged_content: String,
    /// Whether the merge could not be completed cleanly.
    pub has_conflicts: bool,
}

impl MergeResult {
    fn clean(content: &str) -> Self {
        Self {
            merged_content: content.to_string(),
            has_conflicts: false,
        }
    }
}

/// Stateless text merge engine.
pub struct Merger;

impl Merger {
    /// Attempt a three-way merge of `base`, `ours`, and `theirs`.
    pub fn three_way_merge(base: &str, ours: &str, theirs: &str) -> MergeResult {
        // Fast paths: one side unchanged, or both sides made the same change.
        if ours == base || ours == theirs {
            return MergeResult::clean(theirs);
        }
        if theirs == base {
            return MergeResult::clean(ours);
        }

        let patch_theirs = diffy::create_patch(base, theirs);
        if let Ok(merged) = diffy::apply(ours, &patch_theirs) {
            debug!("clean merge via applying theirs-patch to ours");
            return MergeResult::clean(&merged);
        }

        let patch_ours = diffy::create_patch(base, ours);
        if let Ok(merged) = diffy::apply(theirs, &patch_ours) {
            debug!("clean merge via applying ours-patch to theirs");
            return MergeResult::clean(&merged);
        }

        debug!("three-way merge failed");
        MergeResult {
            merged_content: ours.to_string(),
            has_conflicts: true,
        }
    }

    /// Fold every side onto `base` in turn. `None` as soon as one fold conflicts.
    pub fn fold_three_way(base: &str, sides: &[&str]) -> Option<String> {
        let (first, rest) = sides.split_first()?;
        let mut merged = first.to_string();
        for side in rest {
            let result = Self::three_way_merge(base, &merged, side);
            if result.has_conflicts {
                return None;
            }
            merged = result.merged_content;
        }
        Some(merged)
    }

    /// Distinct lines across all contents, in order of first appearance.
    pub fn line_union(contents: &[&str]) -> String {
        let mut lines: Vec<&str> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for content in contents {
            for line in content.lines() {
                if seen.insert(line) {
                    lines.push(line);
                }
            }
        }
        join_lines(&lines, contents)
    }

    /// Lines of the first content that appear in every other content.
    pub fn line_intersection(contents: &[&str]) -> String {
        let Some((first, rest)) = contents.split_first() else {
            return String::new();
        };
        let others: Vec<HashSet<&str>> = rest.iter().map(|c| c.lines().collect()).collect();
        let lines: Vec<&str> = first
            .lines()
            .filter(|line| others.iter().all(|set| set.contains(line)))
            .collect();
        join_lines(&lines, contents)
    }
}

/// Join with `\n`, keeping a trailing newline when any input had one.
fn join_lines(lines: &[&str], inputs: &[&str]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut out = lines.join("\n");
    if inputs.iter().any(|c| c.ends_with('\n')) {
        out.push('\n');
    }
    out
}
