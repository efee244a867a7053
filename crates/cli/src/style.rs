//! Shared styling utilities for CLI output.

use console::Style;

use agentmerge_core::conflict::ConflictKind;
use agentmerge_core::{Resolution, Strategy};

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create a header-styled string (bold, white).
pub fn header(msg: &str) -> String {
    let style = Style::new().bold();
    style.apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// Conflict kind label: red for file-level, yellow for line-level, dim for additions.
pub fn conflict_kind(kind: ConflictKind) -> String {
    let style = match kind {
        ConflictKind::FileLevel => Style::new().red().bold(),
        ConflictKind::LineLevel => Style::new().yellow(),
        ConflictKind::Addition => Style::new().dim(),
    };
    style.apply_to(kind.to_string()).to_string()
}

/// Resolution label: green when it can be written as-is, yellow otherwise.
pub fn resolution(resolution: &Resolution) -> String {
    let style = match resolution {
        Resolution::Accept { .. } => Style::new().green(),
        Resolution::Merge {
            strategy: Strategy::Semantic,
            ..
        } => Style::new().yellow(),
        Resolution::Merge { .. } => Style::new().green(),
        Resolution::ManualRequired { .. } => Style::new().red(),
    };
    style.apply_to(resolution.label()).to_string()
}
