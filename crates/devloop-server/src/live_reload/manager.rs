//! Live reload task management.
//!
//! Wires the watch loop, the debouncer and the rebuild action together and
//! owns the spawned tasks. Shutdown is a `watch` channel: sending on it, or
//! dropping the [`LiveReloadHandle`], stops both tasks.

use std::sync::Arc;
use std::time::Duration;

use devloop_bundler::BundlerAdapter;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::broadcaster::ReloadBroadcaster;
use super::debouncer::Debouncer;
use super::watcher::{EventFilter, SourceWatcher, WatchEvent, run_watch_loop};

/// Running live reload pipeline.
///
/// Dropping the handle signals shutdown; the tasks exit at their next
/// suspension point and the OS watch is released.
pub struct LiveReloadHandle {
    shutdown: watch::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
    watcher: Option<SourceWatcher>,
}

impl LiveReloadHandle {
    /// Signal shutdown and wait for both tasks to finish.
    pub async fn stop(self) {
        let Self {
            shutdown,
            tasks,
            watcher,
        } = self;

        // No receivers left means the tasks are already gone
        let _ = shutdown.send(());
        for task in tasks {
            if let Err(err) = task.await
                && err.is_panic()
            {
                tracing::warn!(error = %err, "Live reload task panicked");
            }
        }
        drop(watcher);
        tracing::debug!("Live reload stopped");
    }
}

/// Rebuild the bundle and, only if that succeeded, tell every client to
/// reload. Returns whether the rebuild succeeded.
pub(crate) async fn rebuild_and_notify(
    adapter: &BundlerAdapter,
    broadcaster: &ReloadBroadcaster,
) -> bool {
    if adapter.rebuild().await.is_err() {
        return false;
    }

    let clients = broadcaster.notify_reload();
    tracing::info!(clients, "Reload notification sent");
    true
}

/// Spawn the debouncer timer task and the watch loop task.
pub(crate) fn spawn(
    adapter: BundlerAdapter,
    broadcaster: Arc<ReloadBroadcaster>,
    events: mpsc::Receiver<WatchEvent>,
    filter: EventFilter,
    quiet_period: Duration,
    watcher: Option<SourceWatcher>,
) -> LiveReloadHandle {
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let debouncer = Arc::new(Debouncer::new(quiet_period));

    let timer = {
        let debouncer = Arc::clone(&debouncer);
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            let adapter = &adapter;
            let broadcaster = broadcaster.as_ref();
            debouncer
                .run(
                    move || async move {
                        rebuild_and_notify(adapter, broadcaster).await;
                    },
                    shutdown,
                )
                .await;
        })
    };

    let watch_loop = tokio::spawn(async move {
        run_watch_loop(events, filter, &debouncer, shutdown_rx).await;
    });

    LiveReloadHandle {
        shutdown: shutdown_tx,
        tasks: vec![timer, watch_loop],
        watcher,
    }
}
