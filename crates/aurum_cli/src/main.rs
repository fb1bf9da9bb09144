//! `aurum` command-line entry point.
//!
//! # Responsibility
//! - Resolve config, start file logging and open the store.
//! - Dispatch one subcommand and map failures to a non-zero exit code.

mod cli;
mod commands;
mod render;

use anyhow::Context;
use aurum_core::{init_logging, open_db, AppConfig};
use clap::Parser;
use std::fs;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("aurum: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("failed to load config")?;

    init_logging(&config.log_level, &config.log_dir).context("failed to start logging")?;

    if let Some(parent) = config.db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create `{}`", parent.display()))?;
    }
    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open store `{}`", config.db_path.display()))?;

    let printer = render::Printer::new(cli.json);
    commands::dispatch(&conn, &config, &printer, cli.command)
}
