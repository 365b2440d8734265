//! # tabtick
//!
//! Command-line front end for the tab rule engine. Rules and a browser
//! snapshot are read from JSON files; `run` applies them to an in-memory
//! host and can write the resulting snapshot back.

#![deny(unsafe_code)]

mod commands;
mod snapshot;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::commands::RunFlags;
use crate::snapshot::Snapshot;

/// Evaluate and run tab automation rules.
#[derive(Parser, Debug)]
#[command(name = "tabtick", about = "Evaluate and run tab automation rules")]
struct Cli {
    /// Settings file (defaults to `~/.tabtick/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `tabtick_rules=trace`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile and validate every rule in a rules file.
    Validate {
        /// Rules file (JSON array).
        #[arg(long)]
        rules: PathBuf,
    },
    /// Show which tabs a rule would match, without acting.
    Preview {
        /// Browser snapshot file.
        #[arg(long)]
        snapshot: PathBuf,
        /// Rules file (JSON array).
        #[arg(long)]
        rules: PathBuf,
        /// Id of the rule to preview.
        #[arg(long)]
        rule: String,
    },
    /// Run every enabled rule against a snapshot.
    Run {
        /// Browser snapshot file.
        #[arg(long)]
        snapshot: PathBuf,
        /// Rules file (JSON array).
        #[arg(long)]
        rules: PathBuf,
        /// Compute everything, change nothing.
        #[arg(long)]
        dry_run: bool,
        /// Run disabled rules too.
        #[arg(long)]
        force: bool,
        /// Evaluate pinned tabs for every rule.
        #[arg(long)]
        include_pinned: bool,
        /// Save the mutated snapshot over the input file.
        #[arg(long)]
        write_back: bool,
    },
    /// List action kinds that can still be added to an action list.
    Compatible {
        /// Comma-separated existing action kinds.
        #[arg(long, value_delimiter = ',')]
        actions: Vec<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{out}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let settings = commands::install_settings(cli.settings.as_deref())?;
    let level = cli.log_level.as_deref().unwrap_or(&settings.logging.level);
    tabtick_core::logging::init_subscriber(level);
    tracing::debug!(?settings, "settings loaded");

    match cli.command {
        Command::Validate { rules } => {
            let results = commands::validate(&commands::load_rules(&rules)?);
            print_json(&results)?;
            if results.iter().any(|r| !r.valid) {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Preview {
            snapshot,
            rules,
            rule,
        } => {
            let report = commands::preview(
                settings,
                Snapshot::load(&snapshot)?,
                &commands::load_rules(&rules)?,
                &rule,
            )?;
            print_json(&report)?;
        }
        Command::Run {
            snapshot,
            rules,
            dry_run,
            force,
            include_pinned,
            write_back,
        } => {
            let flags = RunFlags {
                dry_run,
                force,
                include_pinned,
            };
            let (report, after) = commands::run(
                settings,
                Snapshot::load(&snapshot)?,
                &commands::load_rules(&rules)?,
                flags,
            )
            .await?;
            print_json(&report)?;
            if write_back {
                after.save(&snapshot)?;
                tracing::info!(path = %snapshot.display(), "snapshot written back");
            }
        }
        Command::Compatible { actions } => {
            print_json(&commands::compatible(&actions))?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
