//! TOML-based configuration for agentmerge.
//!
//! Every section is optional; an empty file yields the defaults. Strategy
//! names are kept as strings and checked by [`AppConfig::validate`] so a bad
//! name is reported with the field it came from.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::conflict::Strategy;
use crate::errors::{ConfigError, StrategyError};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub merge: MergeConfig,

    #[serde(default)]
    pub history: HistoryConfig,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Strategy selection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MergeConfig {
    /// Strategy used when the caller names none. Absent means pick one per batch.
    #[serde(default)]
    pub default_strategy: Option<String>,

    /// When false, `manual` falls back to `auto`.
    #[serde(default = "default_true")]
    pub interactive: bool,

    /// Per-path strategy overrides; the first matching pattern wins.
    #[serde(default)]
    pub overrides: Vec<StrategyOverride>,
}

fn default_true() -> bool {
    true
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            default_strategy: None,
            interactive: true,
            overrides: Vec::new(),
        }
    }
}

/// A glob pattern bound to a strategy name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StrategyOverride {
    pub pattern: String,
    pub strategy: String,
}

impl StrategyOverride {
    fn matches(&self, path: &str) -> bool {
        let path = path.replace('\\', "/");
        let pattern = self.pattern.replace('\\', "/");
        glob_match::glob_match(&pattern, &path)
    }
}

impl MergeConfig {
    /// Strategy from the first override matching `path`.
    pub fn override_for(&self, path: &str) -> Result<Option<Strategy>, StrategyError> {
        self.overrides
            .iter()
            .find(|o| o.matches(path))
            .map(|o| o.strategy.parse())
            .transpose()
    }

    /// Configured default strategy, if any.
    pub fn default_strategy(&self) -> Result<Option<Strategy>, StrategyError> {
        self.default_strategy.as_deref().map(str::parse).transpose()
    }

    /// Override for `path`, else the configured default.
    pub fn strategy_for(&self, path: &str) -> Result<Option<Strategy>, StrategyError> {
        match self.override_for(path)? {
            Some(strategy) => Ok(Some(strategy)),
            None => self.default_strategy(),
        }
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryConfig {
    /// JSON snapshot the history log is saved to and replayed from.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** validate -- call [`validate`](Self::validate)
    /// afterwards or use [`load_and_validate`](Self::load_and_validate).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!(overrides = config.merge.overrides.len(), "configuration parsed successfully");
        Ok(config)
    }

    /// Validate that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".into(),
                detail: format!(
                    "'{}' is not one of {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }

        if let Some(name) = &self.merge.default_strategy {
            name.parse::<Strategy>()
                .map_err(|e| ConfigError::InvalidValue {
                    field: "merge.default_strategy".into(),
                    detail: e.to_string(),
                })?;
        }

        for (i, o) in self.merge.overrides.iter().enumerate() {
            if o.pattern.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("merge.overrides[{}].pattern", i),
                    detail: "pattern must not be empty".into(),
                });
            }
            o.strategy
                .parse::<Strategy>()
                .map_err(|e| ConfigError::InvalidValue {
                    field: format!("merge.overrides[{}].strategy", i),
                    detail: e.to_string(),
                })?;
        }

        if let Some(path) = &self.history.snapshot_path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "history.snapshot_path".into(),
                    detail: "snapshot path must not be empty".into(),
                });
            }
        }

        Ok(())
    }

    /// Convenience: load and validate in one call.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML, e.g. for `agentmerge init`.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}
