//! Structural-equivalence oracle boundary.
//!
//! Deep equivalence checks are performed by per-language collaborators
//! outside this crate (AST parsers). The core only consumes their verdicts
//! through [`EquivalenceOracle`]. Calls may be slow, so the tracker never
//! invokes an oracle while holding a per-path lock.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Source language of a tracked path, inferred from its extension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Rust,
    Python,
    Go,
    Elixir,
    JavaScript,
    TypeScript,
    Unknown,
}

impl Language {
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "rs" => Self::Rust,
            "py" => Self::Python,
            "go" => Self::Go,
            "ex" | "exs" => Self::Elixir,
            "js" | "mjs" | "cjs" | "jsx" => Self::JavaScript,
            "ts" | "tsx" => Self::TypeScript,
            _ => Self::Unknown,
        }
    }

    pub fn from_path(path: &str) -> Self {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Prefix of a full-line comment, if the language has one.
    pub fn line_comment(&self) -> Option<&'static str> {
        match self {
            Self::Rust | Self::Go | Self::JavaScript | Self::TypeScript => Some("//"),
            Self::Python | Self::Elixir => Some("#"),
            Self::Unknown => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rust => write!(f, "rust"),
            Self::Python => write!(f, "python"),
            Self::Go => write!(f, "go"),
            Self::Elixir => write!(f, "elixir"),
            Self::JavaScript => write!(f, "javascript"),
            Self::TypeScript => write!(f, "typescript"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Trait implemented by structural comparison collaborators.
pub trait EquivalenceOracle: Send + Sync {
    /// Whether a verdict for `language` is meaningful.
    fn supports(&self, language: Language) -> bool;

    /// `true` when both contents have the same structure.
    fn is_semantically_equivalent(&self, a: &str, b: &str, language: Language) -> bool;
}

/// Verdict over every content against the first one.
///
/// `None` when the oracle does not support the language or there is nothing
/// to compare.
pub fn all_equivalent(
    oracle: &dyn EquivalenceOracle,
    contents: &[&str],
    language: Language,
) -> Option<bool> {
    if contents.is_empty() || !oracle.supports(language) {
        return None;
    }
    let first = contents[0];
    Some(
        contents[1..]
            .iter()
            .all(|c| oracle.is_semantically_equivalent(first, c, language)),
    )
}

// ---------------------------------------------------------------------------
// Built-in oracle
// ---------------------------------------------------------------------------

/// Fallback oracle used when no per-language collaborator is injected.
///
/// Two contents are equivalent when they match after dropping blank lines,
/// full-line comments, and leading/trailing whitespace on every line.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedTextOracle;

impl NormalizedTextOracle {
    fn normalize(content: &str, language: Language) -> Vec<&str> {
        let comment = language.line_comment();
        content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .filter(|l| comment.map_or(true, |c| !l.starts_with(c)))
            .collect()
    }
}

impl EquivalenceOracle for NormalizedTextOracle {
    fn supports(&self, _language: Language) -> bool {
        true
    }

    fn is_semantically_equivalent(&self, a: &str, b: &str, language: Language) -> bool {
        Self::normalize(a, language) == Self::normalize(b, language)
    }
}
