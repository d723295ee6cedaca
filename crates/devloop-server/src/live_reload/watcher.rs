//! Source tree watching.
//!
//! Turns raw `notify` events into [`WatchEvent`]s delivered over a tokio
//! channel, and runs the watch loop that feeds the [`Debouncer`].

use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};

use super::debouncer::Debouncer;

/// Capacity of the channel between the OS watcher and the watch loop.
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Kind of filesystem change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// Entry created.
    Created,
    /// Entry content modified.
    Modified,
    /// Entry removed.
    Removed,
}

impl ChangeKind {
    /// Map a `notify` event kind.
    ///
    /// Renames and metadata-only changes are not content changes and map to
    /// `None`.
    fn from_notify(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Modify(ModifyKind::Name(_) | ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(Self::Modified),
            EventKind::Remove(_) => Some(Self::Removed),
            _ => None,
        }
    }
}

/// A single filesystem change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchEvent {
    /// Absolute path of the changed entry.
    pub path: PathBuf,
    /// Kind of change.
    pub kind: ChangeKind,
}

/// Keeps the OS watch alive; dropping it releases the watch.
pub struct SourceWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl SourceWatcher {
    /// Watch `root` recursively.
    ///
    /// The root is canonicalized first and the OS watch is placed on the
    /// canonical path, so reported event paths start with [`Self::root`] even
    /// when `root` goes through a symlink.
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher cannot be created or `root` cannot be
    /// watched.
    pub fn new(root: &Path) -> Result<(Self, mpsc::Receiver<WatchEvent>), notify::Error> {
        let root = std::fs::canonicalize(root).map_err(notify::Error::io)?;
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(error = %err, "File watcher error");
                    return;
                }
            };
            let Some(kind) = ChangeKind::from_notify(&event.kind) else {
                return;
            };
            for path in event.paths {
                // Callback runs on the watcher's own thread
                if tx.blocking_send(WatchEvent { path, kind }).is_err() {
                    return;
                }
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    /// Canonical directory being watched.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Decides which events count as source changes.
#[derive(Clone, Debug)]
pub struct EventFilter {
    root: PathBuf,
    patterns: Vec<glob::Pattern>,
    ignored: Vec<PathBuf>,
}

impl EventFilter {
    /// Accept every created/modified entry under `root`.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            patterns: Vec::new(),
            ignored: Vec::new(),
        }
    }

    /// Only accept paths (relative to the root) matching one of `patterns`.
    ///
    /// Invalid patterns are skipped.
    #[must_use]
    pub fn with_patterns(mut self, patterns: &[String]) -> Self {
        self.patterns = patterns
            .iter()
            .filter_map(|p| glob::Pattern::new(p).ok())
            .collect();
        self
    }

    /// Never accept `path`, e.g. the bundle output inside the source tree.
    #[must_use]
    pub fn ignoring(mut self, path: impl Into<PathBuf>) -> Self {
        self.ignored.push(path.into());
        self
    }

    /// Whether `event` should schedule a rebuild.
    ///
    /// Deletions never do: a missing entry module would only fail the build.
    pub fn triggers_rebuild(&self, event: &WatchEvent) -> bool {
        if event.kind == ChangeKind::Removed {
            return false;
        }
        if self.ignored.iter().any(|ignored| ignored == &event.path) {
            return false;
        }
        let Ok(relative) = event.path.strip_prefix(&self.root) else {
            return false;
        };
        self.patterns.is_empty()
            || self
                .patterns
                .iter()
                .any(|pattern| pattern.matches_path(relative))
    }
}

/// Consume `events` in arrival order, scheduling a rebuild for each source
/// change, until `shutdown` fires or the event source ends.
pub async fn run_watch_loop(
    mut events: mpsc::Receiver<WatchEvent>,
    filter: EventFilter,
    debouncer: &Debouncer,
    mut shutdown: watch::Receiver<()>,
) {
    loop {
        let event = tokio::select! {
            _ = shutdown.changed() => break,
            event = events.recv() => event,
        };
        let Some(event) = event else {
            break;
        };

        if filter.triggers_rebuild(&event) {
            tracing::debug!(path = %event.path.display(), kind = ?event.kind, "Source changed");
            debouncer.schedule();
        } else {
            tracing::trace!(path = %event.path.display(), kind = ?event.kind, "Ignored filesystem event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind, RenameMode};
    use std::time::Duration;

    fn event(path: &str, kind: ChangeKind) -> WatchEvent {
        WatchEvent {
            path: PathBuf::from(path),
            kind,
        }
    }

    #[test]
    fn test_change_kind_from_notify() {
        assert_eq!(
            ChangeKind::from_notify(&EventKind::Create(CreateKind::File)),
            Some(ChangeKind::Created)
        );
        assert_eq!(
            ChangeKind::from_notify(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(ChangeKind::Modified)
        );
        assert_eq!(
            ChangeKind::from_notify(&EventKind::Modify(ModifyKind::Any)),
            Some(ChangeKind::Modified)
        );
        assert_eq!(
            ChangeKind::from_notify(&EventKind::Remove(RemoveKind::File)),
            Some(ChangeKind::Removed)
        );
    }

    #[test]
    fn test_renames_and_metadata_are_not_changes() {
        assert_eq!(
            ChangeKind::from_notify(&EventKind::Modify(ModifyKind::Name(RenameMode::Both))),
            None
        );
        assert_eq!(
            ChangeKind::from_notify(&EventKind::Modify(ModifyKind::Metadata(
                MetadataKind::Permissions
            ))),
            None
        );
        assert_eq!(ChangeKind::from_notify(&EventKind::Any), None);
    }

    #[test]
    fn test_filter_accepts_created_and_modified() {
        let filter = EventFilter::new(PathBuf::from("/project/src"));

        assert!(filter.triggers_rebuild(&event("/project/src/client.ts", ChangeKind::Modified)));
        assert!(filter.triggers_rebuild(&event("/project/src/new.ts", ChangeKind::Created)));
    }

    #[test]
    fn test_filter_ignores_removals() {
        let filter = EventFilter::new(PathBuf::from("/project/src"));
        assert!(!filter.triggers_rebuild(&event("/project/src/client.ts", ChangeKind::Removed)));
    }

    #[test]
    fn test_filter_ignores_outside_root() {
        let filter = EventFilter::new(PathBuf::from("/project/src"));
        assert!(!filter.triggers_rebuild(&event("/project/README.md", ChangeKind::Modified)));
    }

    #[test]
    fn test_filter_ignores_artifact() {
        let filter = EventFilter::new(PathBuf::from("/project/src"))
            .ignoring("/project/src/client.bundle.js")
            .ignoring("/project/src/client.bundle.js.tmp");

        assert!(!filter.triggers_rebuild(&event(
            "/project/src/client.bundle.js",
            ChangeKind::Modified
        )));
        assert!(!filter.triggers_rebuild(&event(
            "/project/src/client.bundle.js.tmp",
            ChangeKind::Created
        )));
        assert!(filter.triggers_rebuild(&event("/project/src/client.ts", ChangeKind::Modified)));
    }

    #[test]
    fn test_filter_patterns() {
        let filter = EventFilter::new(PathBuf::from("/project/src"))
            .with_patterns(&["**/*.ts".to_owned(), "*.css".to_owned()]);

        assert!(filter.triggers_rebuild(&event("/project/src/client.ts", ChangeKind::Modified)));
        assert!(filter.triggers_rebuild(&event("/project/src/scene/knot.ts", ChangeKind::Modified)));
        assert!(filter.triggers_rebuild(&event("/project/src/app.css", ChangeKind::Modified)));
        assert!(!filter.triggers_rebuild(&event("/project/src/notes.txt", ChangeKind::Modified)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_loop_schedules_on_source_change() {
        let (tx, rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(());
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let filter = EventFilter::new(PathBuf::from("/project/src"));

        tx.send(event("/project/src/client.ts", ChangeKind::Removed))
            .await
            .unwrap();
        tx.send(event("/elsewhere/file.ts", ChangeKind::Modified))
            .await
            .unwrap();
        drop(tx);
        run_watch_loop(rx, filter.clone(), &debouncer, shutdown_rx.clone()).await;
        assert!(!debouncer.state().pending);

        let (tx, rx) = mpsc::channel(8);
        tx.send(event("/project/src/client.ts", ChangeKind::Modified))
            .await
            .unwrap();
        drop(tx);
        run_watch_loop(rx, filter, &debouncer, shutdown_rx).await;
        assert!(debouncer.state().pending);
    }

    #[tokio::test]
    async fn test_watch_loop_stops_on_shutdown() {
        let (_tx, rx) = mpsc::channel::<WatchEvent>(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let debouncer = Debouncer::new(Duration::from_millis(100));

        drop(shutdown_tx);

        // Returns even though the event channel is still open
        run_watch_loop(
            rx,
            EventFilter::new(PathBuf::from("/project/src")),
            &debouncer,
            shutdown_rx,
        )
        .await;
    }

    #[tokio::test]
    async fn test_source_watcher_rejects_missing_directory() {
        let result = SourceWatcher::new(Path::new("/nonexistent/devloop/src"));
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_source_watcher_events_pass_filter_through_symlinked_root() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        let link = dir.path().join("link");
        std::fs::create_dir(&real).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let (watcher, mut rx) = SourceWatcher::new(&link).unwrap();
        assert_eq!(watcher.root(), std::fs::canonicalize(&real).unwrap());
        let filter = EventFilter::new(watcher.root().to_path_buf());

        // Editors write repeatedly; keep writing until an event gets through
        let received = tokio::time::timeout(Duration::from_secs(5), async {
            let mut n = 0;
            loop {
                n += 1;
                std::fs::write(link.join("client.ts"), format!("let a = {n};")).unwrap();
                let deadline = tokio::time::sleep(Duration::from_millis(250));
                tokio::pin!(deadline);
                loop {
                    tokio::select! {
                        () = &mut deadline => break,
                        event = rx.recv() => match event {
                            Some(event) if filter.triggers_rebuild(&event) => return true,
                            Some(_) => {}
                            None => return false,
                        },
                    }
                }
            }
        })
        .await
        .unwrap_or(false);

        assert!(received, "expected a source change under the symlinked root");
        drop(watcher);
    }
}
