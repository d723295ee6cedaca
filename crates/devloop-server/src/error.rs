//! Server error types.

use std::path::PathBuf;

/// Failure to start or run the development server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Address that was requested.
        address: String,
        #[source]
        source: std::io::Error,
    },
    /// The source tree could not be watched.
    #[error("failed to watch {}: {source}", path.display())]
    Watch {
        /// Directory that was requested.
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    /// Serving failed.
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}
