//! Application state.
//!
//! Shared state for all request handlers.

use std::path::PathBuf;
use std::sync::Arc;

use crate::live_reload::ReloadBroadcaster;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Registry of connected reload clients.
    pub(crate) broadcaster: Arc<ReloadBroadcaster>,
    /// Path of the served bundle.
    pub(crate) artifact_path: PathBuf,
    /// Name shown in the HTML shell.
    pub(crate) app_name: String,
    /// Whether the reload stream is mounted.
    pub(crate) live_reload: bool,
}
