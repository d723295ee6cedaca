//! Bundler adapter.
//!
//! Binds a [`Bundler`] to the fixed entry module and artifact path. The
//! bundler writes into a staging file next to the artifact; only a complete,
//! successful build is renamed over the artifact. Readers therefore see either
//! the previous artifact or the new one, and a failed build leaves the
//! previous artifact exactly as it was.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{BundleError, Bundler};

/// Runs full rebuilds of the client bundle.
#[derive(Clone)]
pub struct BundlerAdapter {
    bundler: Arc<dyn Bundler>,
    entry: PathBuf,
    output: PathBuf,
}

impl BundlerAdapter {
    /// Create an adapter for the given entry module and artifact path.
    #[must_use]
    pub fn new(bundler: Arc<dyn Bundler>, entry: PathBuf, output: PathBuf) -> Self {
        Self {
            bundler,
            entry,
            output,
        }
    }

    /// Entry module handed to the bundler.
    #[must_use]
    pub fn entry(&self) -> &Path {
        &self.entry
    }

    /// Path of the served artifact.
    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Staging file the bundler writes to (`<output>.tmp`).
    #[must_use]
    pub fn staging_path(&self) -> PathBuf {
        let mut name = self
            .output
            .file_name()
            .map_or_else(|| OsString::from("bundle"), |n| n.to_os_string());
        name.push(".tmp");
        self.output.with_file_name(name)
    }

    /// Rebuild the artifact from scratch.
    ///
    /// Returns the build duration on success. Failures are logged here and
    /// returned to the caller; the previous artifact is never touched.
    pub async fn rebuild(&self) -> Result<Duration, BundleError> {
        let start = Instant::now();

        match self.try_rebuild().await {
            Ok(()) => {
                let elapsed = start.elapsed();
                tracing::info!(
                    output = %self.output.display(),
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    "Bundle rebuilt"
                );
                Ok(elapsed)
            }
            Err(err) => {
                tracing::warn!(
                    entry = %self.entry.display(),
                    error = %err,
                    "Bundle failed, keeping previous artifact"
                );
                Err(err)
            }
        }
    }

    async fn try_rebuild(&self) -> Result<(), BundleError> {
        if let Some(parent) = self.output.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BundleError::io(parent, e))?;
        }

        let staging = self.staging_path();
        if let Err(err) = self.bundler.bundle(&self.entry, &staging).await {
            discard(&staging).await;
            return Err(err);
        }

        if !tokio::fs::try_exists(&staging).await.unwrap_or(false) {
            return Err(BundleError::MissingOutput(staging));
        }

        tokio::fs::rename(&staging, &self.output)
            .await
            .map_err(|e| BundleError::io(&self.output, e))
    }
}

/// Remove a leftover staging file, ignoring "not found".
async fn discard(staging: &Path) {
    if let Err(err) = tokio::fs::remove_file(staging).await
        && err.kind() != std::io::ErrorKind::NotFound
    {
        tracing::debug!(path = %staging.display(), error = %err, "Failed to remove staging file");
    }
}
