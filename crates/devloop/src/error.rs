//! CLI error types.

use devloop_bundler::BundleError;
use devloop_config::ConfigError;
use devloop_server::ServerError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Bundle failed: {0}")]
    Bundle(#[from] BundleError),

    #[error("{0}")]
    Server(#[from] ServerError),
}
