//! agentmerge command-line tool.
//!
//! Replays a recorded operation log from concurrent provider agents into a
//! tracker and reports file status, conflicts, merge plans, or resolutions.
//! Also generates and validates configuration files.

mod ops;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use agentmerge_core::config::AppConfig;
use agentmerge_core::conflict::select_best_strategy;
use agentmerge_core::logging::init_logging;
use agentmerge_core::models::ListFilter;
use agentmerge_core::{Resolution, Strategy, Tracker};

const DEFAULT_CONFIG: &str = "./agentmerge.toml";

const CONFIG_TEMPLATE: &str = r#"# agentmerge configuration
# See documentation for all available options.

[logging]
level = "info"

[merge]
# Strategy used when none is given on the command line. When unset, one is
# chosen per batch from the conflicts found.
# default_strategy = "auto"
interactive = true

# Per-path overrides; the first matching glob wins.
[[merge.overrides]]
pattern = "**/*.lock"
strategy = "last_write_wins"

[history]
# snapshot_path = "./.agentmerge/history.json"
"#;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// agentmerge command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "agentmerge",
    version,
    about = "Track and reconcile file edits from concurrent AI provider agents"
)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when absent.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (overrides the configured level; RUST_LOG overrides both).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,

    /// Replay an operation log and report on the result.
    Replay {
        /// JSON operation log.
        ops: PathBuf,

        /// What to report.
        #[arg(value_enum, default_value_t = View::Status)]
        view: View,

        /// Strategy for `plan` and `resolve`. Chosen per batch when omitted.
        #[arg(short, long)]
        strategy: Option<String>,

        /// Only files this provider touched (`status` view).
        #[arg(short, long)]
        provider: Option<String>,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,

        /// Save the replayed history to the configured snapshot path.
        #[arg(long)]
        save: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum View {
    Status,
    Conflicts,
    Plan,
    Resolve,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { output } => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"));
            cmd_init(&output).await
        }
        Commands::Validate => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"));
            let path = cli.config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
            cmd_validate(&path)
        }
        Commands::Replay {
            ops: ops_path,
            view,
            strategy,
            provider,
            json,
            save,
        } => {
            let config = load_config(cli.config.as_deref())?;
            init_logging(cli.log_level.as_deref().unwrap_or(&config.logging.level));

            let tracker = Tracker::from_config(&config);
            let entries = ops::load(&ops_path).await?;
            let summary = ops::replay(&tracker, entries);
            if !json {
                println!(
                    "{}",
                    style::dim(&format!(
                        "replayed {} operations, {} lock changes ({} rejected)",
                        summary.operations, summary.lock_changes, summary.rejected
                    ))
                );
            }

            match view {
                View::Status => cmd_status(&tracker, provider, json)?,
                View::Conflicts => cmd_conflicts(&tracker, json)?,
                View::Plan => cmd_plan(&tracker, strategy.as_deref(), json)?,
                View::Resolve => cmd_resolve(&tracker, strategy.as_deref(), json)?,
            }

            if save {
                let path = config
                    .history
                    .snapshot_path
                    .as_deref()
                    .context("--save needs [history] snapshot_path in the configuration")?;
                tracker
                    .save_history(path)
                    .context("failed to save history snapshot")?;
                if !json {
                    println!("{}", style::success(&format!("history saved to {}", path.display())));
                }
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

/// Explicit path must exist; the default path is optional.
fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => {
            AppConfig::load_and_validate(path).context("failed to load configuration file")
        }
        None if Path::new(DEFAULT_CONFIG).exists() => AppConfig::load_and_validate(DEFAULT_CONFIG)
            .context("failed to load configuration file"),
        None => Ok(AppConfig::default()),
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

async fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    tokio::fs::write(output, CONFIG_TEMPLATE)
        .await
        .context("failed to write config file")?;

    println!(
        "{}",
        style::success(&format!("Default configuration written to {}", output.display())),
    );
    println!();
    println!("Next steps:");
    println!("  1. Adjust strategies and overrides for your project");
    println!("  2. Validate with: agentmerge validate --config {}", output.display());
    println!(
        "  3. Replay a session: agentmerge --config {} replay ops.json conflicts",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let config = AppConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    match config.validate() {
        Ok(()) => println!("  [OK] All values are valid"),
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    println!();
    println!("Configuration summary:");
    println!("  Log level        : {}", config.logging.level);
    println!(
        "  Default strategy : {}",
        config
            .merge
            .default_strategy
            .as_deref()
            .unwrap_or("chosen per batch")
    );
    println!("  Interactive      : {}", config.merge.interactive);
    println!("  Overrides        : {}", config.merge.overrides.len());
    for o in &config.merge.overrides {
        println!("    {} -> {}", o.pattern, o.strategy);
    }
    println!(
        "  Snapshot path    : {}",
        config
            .history
            .snapshot_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "not set".to_string())
    );
    println!();
    println!("Configuration is valid.");

    Ok(())
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("failed to serialize output")?);
    Ok(())
}

fn cmd_status(tracker: &Tracker, provider: Option<String>, json: bool) -> Result<()> {
    let filter = ListFilter { provider };
    let files = tracker.list_files(&filter);
    if json {
        return print_json(&files);
    }

    if files.is_empty() {
        println!("No tracked files.");
        return Ok(());
    }

    let mut table = new_table(vec!["File", "Owner", "Status", "Contributors", "Locked by", "Ops"]);
    for f in &files {
        table.add_row(vec![
            Cell::new(&f.path),
            Cell::new(f.owner.as_deref().unwrap_or("—")),
            Cell::new(f.status),
            Cell::new(f.contributors.join(", ")),
            Cell::new(f.locked_by.as_deref().unwrap_or("—")),
            Cell::new(f.operations),
        ]);
    }
    println!("{}", table);

    let stats = tracker.get_stats();
    println!(
        "{}",
        style::dim(&format!(
            "{} files, {} operations, {} providers, {} conflicts",
            stats.files_tracked, stats.total_operations, stats.providers, stats.conflicts
        ))
    );
    Ok(())
}

fn cmd_conflicts(tracker: &Tracker, json: bool) -> Result<()> {
    let conflicts = tracker.list_conflicts();
    if json {
        return print_json(&conflicts);
    }

    if conflicts.is_empty() {
        println!("{}", style::success("No conflicts."));
        return Ok(());
    }

    println!("{}", style::header(&format!("{} conflicts", conflicts.len())));
    let mut table = new_table(vec!["File", "Kind", "Providers", "Ranges"]);
    for c in &conflicts {
        let ranges = c
            .ranges()
            .iter()
            .map(|(p, r)| format!("{}: {}", p, r))
            .collect::<Vec<_>>()
            .join("\n");
        table.add_row(vec![
            Cell::new(&c.path),
            Cell::new(style::conflict_kind(c.kind)),
            Cell::new(c.providers.join(", ")),
            Cell::new(ranges),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn cmd_plan(tracker: &Tracker, strategy: Option<&str>, json: bool) -> Result<()> {
    let conflicts = tracker.list_conflicts();
    let strategy: Strategy = match strategy {
        Some(name) => name.parse()?,
        None => select_best_strategy(&conflicts),
    };
    let plan = tracker.create_merge_plan(&conflicts, strategy);
    if json {
        return print_json(&plan);
    }

    if plan.is_empty() {
        println!("{}", style::success("Nothing to merge."));
        return Ok(());
    }

    println!("{}", style::header(&format!("Merge plan ({})", strategy)));
    let mut table = new_table(vec!["File", "Strategy", "Action"]);
    for entry in &plan {
        table.add_row(vec![
            Cell::new(&entry.path),
            Cell::new(entry.strategy),
            Cell::new(&entry.description),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn cmd_resolve(tracker: &Tracker, strategy: Option<&str>, json: bool) -> Result<()> {
    let resolutions = tracker.resolve_all(strategy)?;
    if json {
        return print_json(&resolutions);
    }

    if resolutions.is_empty() {
        println!("No tracked files.");
        return Ok(());
    }

    let mut table = new_table(vec!["File", "Resolution", "Detail"]);
    let mut manual = 0;
    for (path, resolution) in &resolutions {
        let detail = match resolution {
            Resolution::ManualRequired { reason } => {
                manual += 1;
                reason.clone()
            }
            other => match other.content() {
                Some(content) => format!("{} lines", content.lines().count()),
                None => "delete".to_string(),
            },
        };
        table.add_row(vec![
            Cell::new(path),
            Cell::new(style::resolution(resolution)),
            Cell::new(detail),
        ]);
    }
    println!("{}", table);

    if manual > 0 {
        println!("{}", style::warn(&format!("{} files need manual resolution", manual)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_template_is_valid() {
        let config: AppConfig = toml::from_str(CONFIG_TEMPLATE).unwrap();
        config.validate().unwrap();
        assert_eq!(
            config.merge.strategy_for("web/yarn.lock").unwrap(),
            Some(Strategy::LastWriteWins)
        );
    }

    #[test]
    fn test_cli_parses_replay() {
        let cli = Cli::try_parse_from([
            "agentmerge",
            "replay",
            "ops.json",
            "resolve",
            "--strategy",
            "union",
        ])
        .unwrap();
        match cli.command {
            Commands::Replay { view, strategy, .. } => {
                assert_eq!(view, View::Resolve);
                assert_eq!(strategy.as_deref(), Some("union"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agentmerge.toml");
        cmd_init(&path).await.unwrap();
        assert!(AppConfig::load_and_validate(&path).is_ok());
        assert!(cmd_init(&path).await.is_err());
    }
}
