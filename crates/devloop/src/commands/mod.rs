//! CLI command implementations.

pub(crate) mod bundle;
pub(crate) mod serve;

pub(crate) use bundle::BundleArgs;
pub(crate) use serve::ServeArgs;

use std::path::{Path, PathBuf};

use devloop_bundler::CommandBundler;
use devloop_config::Config;

/// Bundler described by `config`, run from the project directory.
pub(crate) fn bundler_from_config(config: &Config) -> CommandBundler {
    CommandBundler::from_config(&config.bundle_resolved).with_current_dir(project_dir(config))
}

/// Directory containing the config file, or the current directory.
fn project_dir(config: &Config) -> PathBuf {
    config
        .config_path
        .as_ref()
        .and_then(|p| p.parent())
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default()
}
