//! devloop CLI - watch, rebuild and live-reload development server.
//!
//! Provides commands for:
//! - `serve`: Build the client bundle, serve it and reload browsers on change
//! - `bundle`: Build the client bundle once

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BundleArgs, ServeArgs};
use error::CliError;
use output::Output;

/// devloop - development server with live reload.
#[derive(Parser)]
#[command(name = "devloop", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the development server.
    Serve(ServeArgs),
    /// Build the client bundle once.
    Bundle(BundleArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Serve(args) => args.verbose,
            Self::Bundle(args) => args.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.command.verbose()))
        .init();

    if let Err(err) = run(cli.command) {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

/// `--verbose` enables INFO level, otherwise use `RUST_LOG` or default to WARN.
fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

/// Run a command on a single-threaded runtime.
fn run(command: Commands) -> Result<(), CliError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match command {
        Commands::Serve(args) => rt.block_on(args.execute()),
        Commands::Bundle(args) => rt.block_on(args.execute()),
    }
}
