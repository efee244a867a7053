//! Enclosing-scope lookup for line ranges.
//!
//! A range names its scope explicitly when the caller knows it. Otherwise the
//! nearest definition line at or above the range start is used, recognised by
//! the usual definition keywords of the languages agents commonly write.

use std::sync::OnceLock;

use regex_lite::Regex;

use crate::conflict::detector::ProviderVersion;

const DEFINITION_PATTERN: &str = concat!(
    r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:unsafe\s+)?(?:export\s+)?",
    r"(?:fn|def|defp|defmacro|defmodule|func|function|class|impl|trait|struct|enum|module)\s+",
    r"(?:\([^)]*\)\s*)?([A-Za-z_][A-Za-z0-9_.!?]*)",
);

fn definition_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DEFINITION_PATTERN).ok()).as_ref()
}

/// Name of the definition enclosing `line` (0-based), if any.
pub fn infer_scope(content: &str, line: usize) -> Option<String> {
    let re = definition_regex()?;
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return None;
    }
    let start = line.min(lines.len() - 1);
    lines[..=start]
        .iter()
        .rev()
        .find_map(|l| re.captures(l))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Explicit scope of the version's range, else the one inferred from its content.
pub fn scope_of(version: &ProviderVersion) -> Option<String> {
    if let Some(scope) = &version.range.scope {
        return Some(scope.clone());
    }
    version
        .content
        .as_deref()
        .or(version.prior_content.as_deref())
        .and_then(|c| infer_scope(c, version.range.start))
}
