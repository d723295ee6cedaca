//! Development server instance.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use devloop_bundler::{BundleError, Bundler, BundlerAdapter};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::ServerSettings;
use crate::app::create_router;
use crate::error::ServerError;
use crate::live_reload::{
    self, EventFilter, LiveReloadHandle, ReloadBroadcaster, SourceWatcher, WatchEvent,
};
use crate::state::AppState;

/// One development server: its reload client registry, its artifact and the
/// bundler that produces it.
///
/// Instances share nothing, so several can run side by side.
pub struct DevServer {
    settings: ServerSettings,
    adapter: BundlerAdapter,
    broadcaster: Arc<ReloadBroadcaster>,
}

impl DevServer {
    /// Create a server that builds with `bundler`.
    #[must_use]
    pub fn new(settings: ServerSettings, bundler: Arc<dyn Bundler>) -> Self {
        let adapter = BundlerAdapter::new(
            bundler,
            settings.entry.clone(),
            settings.artifact_path.clone(),
        );
        Self {
            settings,
            adapter,
            broadcaster: Arc::new(ReloadBroadcaster::new()),
        }
    }

    /// Settings this server was created with.
    #[must_use]
    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Registry of connected reload clients.
    #[must_use]
    pub fn broadcaster(&self) -> &Arc<ReloadBroadcaster> {
        &self.broadcaster
    }

    /// Path of the served bundle.
    #[must_use]
    pub fn artifact_path(&self) -> &Path {
        self.adapter.output()
    }

    /// Build the HTTP router.
    pub fn router(&self) -> Router {
        create_router(Arc::new(AppState {
            broadcaster: Arc::clone(&self.broadcaster),
            artifact_path: self.adapter.output().to_path_buf(),
            app_name: self.settings.app_name.clone(),
            live_reload: self.settings.live_reload_enabled,
        }))
    }

    /// Rebuild the bundle once without notifying clients.
    ///
    /// # Errors
    ///
    /// Returns the bundler failure; the previous artifact is kept.
    pub async fn rebuild(&self) -> Result<Duration, BundleError> {
        self.adapter.rebuild().await
    }

    /// Rebuild the bundle and push a reload to every client if it succeeded.
    pub async fn rebuild_and_notify(&self) -> bool {
        live_reload::rebuild_and_notify(&self.adapter, &self.broadcaster).await
    }

    /// Watch the source tree and rebuild on change.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Watch`] if the source tree cannot be watched.
    pub fn start_live_reload(&self) -> Result<LiveReloadHandle, ServerError> {
        let watch_dir = &self.settings.watch_dir;
        let (watcher, events) =
            SourceWatcher::new(watch_dir).map_err(|source| ServerError::Watch {
                path: watch_dir.clone(),
                source,
            })?;
        tracing::info!(path = %watcher.root().display(), "Watching for changes");

        Ok(self.spawn_pipeline(events, Some(watcher)))
    }

    /// Run the live reload pipeline on an externally supplied event source.
    pub fn spawn_live_reload(&self, events: mpsc::Receiver<WatchEvent>) -> LiveReloadHandle {
        self.spawn_pipeline(events, None)
    }

    fn spawn_pipeline(
        &self,
        events: mpsc::Receiver<WatchEvent>,
        watcher: Option<SourceWatcher>,
    ) -> LiveReloadHandle {
        // Filter on the exact root the OS watch was placed on
        let root = watcher.as_ref().map_or_else(
            || canonical(&self.settings.watch_dir),
            |watcher| watcher.root().to_path_buf(),
        );

        live_reload::spawn(
            self.adapter.clone(),
            Arc::clone(&self.broadcaster),
            events,
            self.event_filter(root),
            self.settings.debounce,
            watcher,
        )
    }

    /// Filter for the watch loop rooted at `root`. Ignored paths are also
    /// added in canonical form so they line up with what the OS watcher
    /// reports.
    fn event_filter(&self, root: PathBuf) -> EventFilter {
        let patterns = self.settings.watch_patterns.as_deref().unwrap_or_default();

        let mut filter = EventFilter::new(root).with_patterns(patterns);
        for ignored in [
            self.adapter.output().to_path_buf(),
            self.adapter.staging_path(),
        ] {
            if let (Some(parent), Some(name)) = (ignored.parent(), ignored.file_name()) {
                filter = filter.ignoring(canonical(parent).join(name));
            }
            filter = filter.ignoring(ignored);
        }
        filter
    }

    /// Bind the configured address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let address = format!("{}:{}", self.settings.host, self.settings.port);
        TcpListener::bind(address.as_str())
            .await
            .map_err(|source| ServerError::Bind { address, source })
    }

    /// Serve until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serve until `signal` completes, then end every reload stream so the
    /// open connections can drain.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails.
    pub async fn serve_with_shutdown(
        &self,
        listener: TcpListener,
        signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let broadcaster = Arc::clone(&self.broadcaster);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                signal.await;
                broadcaster.disconnect_all();
            })
            .await?;
        Ok(())
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}
