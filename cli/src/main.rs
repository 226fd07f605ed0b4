// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Lighthouse Command CLI
//!
//! The `lighthouse-command` binary runs the service that mirrors Kubernetes
//! objects reported by lighthouse agents into the document store.
//!
//! ## Commands
//!
//! - `lighthouse-command serve [--host] [--port]` - Run the HTTP service
//! - `lighthouse-command config show|validate|generate` - Configuration management
//!
//! Outside `RUN_MODE=PRODUCTION` a `.env` file in the working directory is
//! loaded before the environment is read.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::debug;

use lighthouse_command::commands::{self, ConfigCommand, ServeArgs};
use lighthouse_command_core::domain::config::{CommandConfigManifest, RunMode};

/// Lighthouse command service - mirror cluster state reported by agents
#[derive(Parser, Debug)]
#[command(name = "lighthouse-command")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "LIGHTHOUSE_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to spec.observability.log_level
    #[arg(long, global = true, env = "LIGHTHOUSE_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP service
    #[command(name = "serve")]
    Serve(ServeArgs),

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let run_mode = RunMode::from_env();
    let dotenv = if run_mode.loads_dotenv() {
        dotenvy::dotenv().ok()
    } else {
        None
    };

    let cli = Cli::parse();

    let level = match &cli.log_level {
        Some(level) => level.clone(),
        None => CommandConfigManifest::load_or_default(cli.config.clone())
            .map(|config| config.spec.observability.log_level)
            .unwrap_or_else(|_| "info".to_string()),
    };
    init_logging(&level)?;
    debug!(?run_mode, dotenv = ?dotenv, "Environment prepared");

    match cli.command {
        Some(Commands::Serve(args)) => commands::serve::execute(args, cli.config).await,
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
