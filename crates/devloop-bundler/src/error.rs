//! Bundle error types.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

/// Failure of a single bundle attempt.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    /// The bundler process could not be started.
    #[error("failed to start bundler `{command}`: {source}")]
    Spawn {
        /// Executable that failed to start.
        command: String,
        #[source]
        source: std::io::Error,
    },
    /// The bundler ran and reported failure.
    #[error("bundler exited with {status}")]
    Failed {
        /// Exit status reported by the process.
        status: ExitStatus,
    },
    /// The bundler reported success but left no output behind.
    #[error("bundler produced no output at {}", .0.display())]
    MissingOutput(PathBuf),
    /// The bundler did not finish in time and was killed.
    #[error("bundler timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
    /// Preparing or publishing the artifact failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path the operation was acting on.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Any other bundler-reported failure.
    #[error("{0}")]
    Other(String),
}

impl BundleError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
