//! CLI command definitions for checkconnect
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod config;

use crate::bootstrap::BootstrapOptions;
use crate::logging::Severity;
use clap::{ArgAction, Parser, Subcommand};
use config::ConfigArgs;
use std::path::PathBuf;

/// Connectivity checks with layered configuration and structured logging
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for INFO, -vv for DEBUG)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file (must exist)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Language for messages (e.g. en, de)
    #[arg(short, long, global = true, value_name = "LANG")]
    pub language: Option<String>,

    /// Also log to the console regardless of configuration
    #[arg(long, global = true)]
    pub console: bool,

    /// Explicit log level; takes precedence over -v
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<Severity>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect or change the configuration
    Config(ConfigArgs),

    /// Show non-fatal initialization diagnostics
    Diagnostics,
}

impl Cli {
    /// The CLI-side log level handed to the logging manager.
    pub fn verbosity_level(&self) -> Severity {
        self.log_level
            .unwrap_or_else(|| Severity::from_verbosity(self.verbose))
    }

    pub fn bootstrap_options(&self) -> BootstrapOptions {
        BootstrapOptions {
            config_path: self.config.clone(),
            language: self.language.clone(),
            cli_level: Some(self.verbosity_level()),
            enable_console: self.console,
        }
    }
}
