//! Development server for devloop.
//!
//! Serves the HTML shell, the compiled client bundle and a server-sent events
//! stream that tells connected browsers to reload after each successful
//! rebuild.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use devloop_bundler::CommandBundler;
//! use devloop_server::{ServerSettings, run_server};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let bundler = Arc::new(CommandBundler::new(
//!         "deno",
//!         vec!["bundle".into(), "--output".into(), "{output}".into(), "{entry}".into()],
//!     ));
//!     run_server(ServerSettings::default(), bundler).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! notify ──► watch loop ──► Debouncer ──► BundlerAdapter::rebuild()
//!                                              │ success
//!                                              ▼
//! Browser ◄──SSE── /__reload ◄── ReloadBroadcaster::notify_reload()
//!    │
//!    ├──GET /                 ──► HTML shell
//!    └──GET /client.bundle.js ──► current artifact bytes (404 before first build)
//! ```

mod app;
mod browser;
mod dev_server;
mod error;
mod handlers;
mod live_reload;
mod middleware;
mod state;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use devloop_bundler::Bundler;

pub use dev_server::DevServer;
pub use error::ServerError;
pub use handlers::index::render_index_html;
pub use live_reload::{
    ChangeKind, ClientId, ClientState, DebounceState, Debouncer, DeliveryError, EventFilter,
    LiveReloadHandle, RELOAD_MESSAGE, ReloadBroadcaster, ReloadClient, ReloadSink, SourceWatcher,
    WatchEvent, run_watch_loop,
};

/// Path the compiled bundle is served at.
pub const BUNDLE_ROUTE: &str = "/client.bundle.js";

/// Path of the reload event stream.
pub const RELOAD_ROUTE: &str = "/__reload";

/// Server settings.
#[derive(Clone, Debug)]
pub struct ServerSettings {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Name shown in the HTML shell.
    pub app_name: String,
    /// Entry module handed to the bundler.
    pub entry: PathBuf,
    /// Path of the compiled bundle.
    pub artifact_path: PathBuf,
    /// Enable the watch loop and reload stream.
    pub live_reload_enabled: bool,
    /// Source tree to watch.
    pub watch_dir: PathBuf,
    /// Quiet period before a burst of changes triggers a rebuild.
    pub debounce: Duration,
    /// Glob patterns for paths that count as source changes.
    pub watch_patterns: Option<Vec<String>>,
    /// Open the default browser once the server is listening.
    pub open_browser: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8000,
            app_name: "devloop".to_owned(),
            entry: PathBuf::from("src/client.ts"),
            artifact_path: PathBuf::from("bin/deno_cache/client.bundle.js"),
            live_reload_enabled: true,
            watch_dir: PathBuf::from("src"),
            debounce: Duration::from_millis(100),
            watch_patterns: None,
            open_browser: false,
        }
    }
}

/// Run the development server until Ctrl-C.
///
/// Builds once up front; a failed initial build is logged and the bundle
/// endpoint answers 404 until a later build succeeds.
///
/// # Errors
///
/// Returns an error if the source tree cannot be watched or the listener
/// cannot be bound.
pub async fn run_server(
    settings: ServerSettings,
    bundler: Arc<dyn Bundler>,
) -> Result<(), ServerError> {
    let server = DevServer::new(settings, bundler);

    // Failure already logged by the adapter
    let _ = server.rebuild().await;

    let live_reload = if server.settings().live_reload_enabled {
        Some(server.start_live_reload()?)
    } else {
        None
    };

    let listener = server.bind().await?;
    let url = format!("http://localhost:{}/", listener.local_addr()?.port());
    tracing::info!(url = %url, "Server running");

    if server.settings().open_browser {
        tokio::spawn(async move { browser::open(&url).await });
    }

    let result = server.serve(listener).await;

    if let Some(handle) = live_reload {
        handle.stop().await;
    }
    result
}

/// Create server settings from devloop configuration.
#[must_use]
pub fn server_settings_from_config(config: &devloop_config::Config) -> ServerSettings {
    let bundle = &config.bundle_resolved;
    let live_reload = &config.live_reload_resolved;

    ServerSettings {
        host: config.server.host.clone(),
        port: config.server.port,
        app_name: config.app.name.clone(),
        entry: bundle.entry.clone(),
        artifact_path: bundle.output.clone(),
        live_reload_enabled: live_reload.enabled,
        watch_dir: live_reload.watch_dir.clone(),
        debounce: live_reload.debounce(),
        watch_patterns: live_reload.watch_patterns.clone(),
        open_browser: false,
    }
}
