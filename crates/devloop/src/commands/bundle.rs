//! `devloop bundle` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use devloop_bundler::BundlerAdapter;
use devloop_config::Config;

use super::bundler_from_config;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the bundle command.
#[derive(Args)]
pub(crate) struct BundleArgs {
    /// Path to configuration file (default: auto-discover devloop.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl BundleArgs {
    /// Execute the bundle command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the bundler fails.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(self.config.as_deref(), None)?;
        let bundle = &config.bundle_resolved;

        let adapter = BundlerAdapter::new(
            Arc::new(bundler_from_config(&config)),
            bundle.entry.clone(),
            bundle.output.clone(),
        );

        output.info(&format!("Bundling {}", adapter.entry().display()));
        let elapsed = adapter.rebuild().await?;

        output.success(&format!(
            "Bundle written to {} in {}ms",
            adapter.output().display(),
            elapsed.as_millis()
        ));
        Ok(())
    }
}
