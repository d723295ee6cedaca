//! `devloop serve` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use devloop_config::{CliSettings, Config};
use devloop_server::{run_server, server_settings_from_config};

use super::bundler_from_config;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover devloop.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable live reload (default: enabled).
    #[arg(long)]
    live_reload: Option<bool>,

    /// Disable live reload.
    #[arg(long, conflicts_with = "live_reload")]
    no_live_reload: bool,

    /// Quiet period in milliseconds before a burst of changes triggers a rebuild.
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Open the server URL in the default browser.
    #[arg(long)]
    open: bool,

    /// Enable verbose output (build and reload logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            live_reload_enabled: self.resolve_live_reload_enabled(),
            host: self.host,
            port: self.port,
            debounce_ms: self.debounce_ms,
        };

        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        output.highlight(&format!(
            "Starting server on http://{}:{}/",
            config.server.host, config.server.port
        ));
        output.info(&format!(
            "Entry module: {}",
            config.bundle_resolved.entry.display()
        ));
        output.info(&format!(
            "Bundle output: {}",
            config.bundle_resolved.output.display()
        ));

        let live_reload = &config.live_reload_resolved;
        if live_reload.enabled {
            output.info(&format!(
                "Live reload: enabled (watching {}, {}ms debounce)",
                live_reload.watch_dir.display(),
                live_reload.debounce_ms
            ));
        } else {
            output.info("Live reload: disabled");
        }

        let mut settings = server_settings_from_config(&config);
        settings.open_browser = self.open;
        run_server(settings, Arc::new(bundler_from_config(&config))).await?;

        Ok(())
    }

    /// Resolve `live_reload_enabled` from --live-reload/--no-live-reload flags.
    fn resolve_live_reload_enabled(&self) -> Option<bool> {
        self.no_live_reload.then_some(false).or(self.live_reload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ServeArgs,
    }

    fn parse(args: &[&str]) -> ServeArgs {
        let argv = std::iter::once("serve").chain(args.iter().copied());
        TestCli::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn test_live_reload_default_is_unset() {
        assert_eq!(parse(&[]).resolve_live_reload_enabled(), None);
    }

    #[test]
    fn test_no_live_reload() {
        assert_eq!(
            parse(&["--no-live-reload"]).resolve_live_reload_enabled(),
            Some(false)
        );
    }

    #[test]
    fn test_live_reload_explicit() {
        assert_eq!(
            parse(&["--live-reload", "true"]).resolve_live_reload_enabled(),
            Some(true)
        );
        assert_eq!(
            parse(&["--live-reload", "false"]).resolve_live_reload_enabled(),
            Some(false)
        );
    }

    #[test]
    fn test_overrides_parse() {
        let args = parse(&["--host", "0.0.0.0", "-p", "9000", "--debounce-ms", "250", "--open"]);

        assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(args.port, Some(9000));
        assert_eq!(args.debounce_ms, Some(250));
        assert!(args.open);
    }
}
