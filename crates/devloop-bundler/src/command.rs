//! Sub-process bundler.
//!
//! Runs an external tool such as `deno bundle` or `esbuild`, inheriting
//! stdout/stderr so its diagnostics reach the terminal unchanged.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use devloop_config::BundleConfig;
use tokio::process::Command;

use crate::{BundleError, BundleFuture, Bundler};

/// Placeholder replaced with the entry module path.
const ENTRY_PLACEHOLDER: &str = "{entry}";
/// Placeholder replaced with the output path.
const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Bundler backed by an external command.
#[derive(Debug, Clone)]
pub struct CommandBundler {
    command: String,
    args: Vec<String>,
    timeout: Option<Duration>,
    current_dir: Option<PathBuf>,
}

impl CommandBundler {
    /// Create a bundler running `command` with the given argument template.
    ///
    /// `{entry}` and `{output}` inside any argument are replaced with the
    /// paths passed to [`Bundler::bundle`].
    #[must_use]
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            timeout: None,
            current_dir: None,
        }
    }

    /// Create a bundler from resolved configuration.
    #[must_use]
    pub fn from_config(config: &BundleConfig) -> Self {
        Self::new(config.command.clone(), config.args.clone()).with_timeout(config.timeout)
    }

    /// Kill the process if it runs longer than `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the process in `dir` instead of the current directory.
    #[must_use]
    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Substitute placeholders in the argument template.
    fn render_args(&self, entry: &Path, output: &Path) -> Vec<String> {
        let entry = entry.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(ENTRY_PLACEHOLDER, &entry)
                    .replace(OUTPUT_PLACEHOLDER, &output)
            })
            .collect()
    }
}

impl Bundler for CommandBundler {
    fn bundle<'a>(&'a self, entry: &'a Path, output: &'a Path) -> BundleFuture<'a> {
        Box::pin(async move {
            let args = self.render_args(entry, output);

            let mut command = Command::new(&self.command);
            command.args(&args).stdin(Stdio::null()).kill_on_drop(true);
            if let Some(dir) = &self.current_dir {
                command.current_dir(dir);
            }

            tracing::debug!(command = %self.command, ?args, "Running bundler");

            let mut child = command.spawn().map_err(|source| BundleError::Spawn {
                command: self.command.clone(),
                source,
            })?;

            let waited = match self.timeout {
                Some(limit) => {
                    if let Ok(result) = tokio::time::timeout(limit, child.wait()).await {
                        result
                    } else {
                        let _ = child.kill().await;
                        return Err(BundleError::TimedOut(limit));
                    }
                }
                None => child.wait().await,
            };
            let status = waited.map_err(|source| BundleError::Spawn {
                command: self.command.clone(),
                source,
            })?;

            if !status.success() {
                return Err(BundleError::Failed { status });
            }

            Ok(())
        })
    }
}
