//! checkconnect command-line entry point
//!
//! Bootstraps configuration, translation and logging, then runs the
//! requested subcommand. Any fatal error is printed as a single critical
//! line and the process exits with status 1.

use anyhow::{Context, Result};
use checkconnect::bootstrap;
use checkconnect::cli::config::{ConfigArgs, ConfigCommand, parse_value};
use checkconnect::cli::{Cli, Command};
use checkconnect::context::RuntimeContext;
use checkconnect::logging::subscriber_for;
use clap::Parser;
use serde_json::Value;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("critical: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    // Warnings raised while loading configuration go to stderr until the
    // logging manager replaces the bootstrap sink.
    let registry = bootstrap::bootstrap_registry();
    tracing::subscriber::set_global_default(subscriber_for(Arc::clone(&registry)))?;

    let result = bootstrap::bootstrap(&cli.bootstrap_options(), registry)
        .map_err(anyhow::Error::from)
        .and_then(|context| {
            debug!(command = ?cli.command, "Bootstrap complete");
            match &cli.command {
                Command::Config(args) => run_config(&context, args),
                Command::Diagnostics => {
                    run_diagnostics();
                    Ok(())
                }
            }
        });

    bootstrap::shutdown_logging();
    result
}

fn run_config(context: &RuntimeContext, args: &ConfigArgs) -> Result<()> {
    let settings = context.settings();
    match &args.action {
        ConfigCommand::Show => {
            let yaml = settings
                .as_dict()
                .to_yaml()
                .context("Failed to serialize configuration")?;
            print!("{}", yaml);
        }
        ConfigCommand::Path => {
            match settings.loaded_config_file() {
                Some(path) => println!("loaded: {}", path.display()),
                None => println!("loaded: (built-in defaults, not persisted)"),
            }
            if let Some(explicit) = settings.explicit_path() {
                println!("explicit: {}", explicit.display());
            }
            for candidate in settings.paths().candidates() {
                let marker = if candidate.path.exists() { "*" } else { " " };
                println!("{} {:<18} {}", marker, candidate.kind, candidate.path.display());
            }
        }
        ConfigCommand::Get { section, key } => {
            println!("{}", settings.get(section, key, Value::Null));
        }
        ConfigCommand::Set {
            section,
            key,
            value,
        } => {
            let value = parse_value(value);
            settings.set(section, key, value.clone())?;
            info!(section = %section, key = %key, "Configuration updated");
            println!("{}.{} = {}", section, key, value);
        }
    }
    Ok(())
}

fn run_diagnostics() {
    let errors = bootstrap::initialization_errors();
    if errors.is_empty() {
        println!("No initialization errors.");
        return;
    }
    for (component, message) in errors {
        println!("{:<10} {}", component, message);
    }
}
