//! Live reload: watch → debounce → rebuild → broadcast.

mod broadcaster;
mod client;
mod debouncer;
mod manager;
mod stream;
mod watcher;

pub use broadcaster::{ClientId, RELOAD_MESSAGE, ReloadBroadcaster};
pub use client::{ClientState, DeliveryError, ReloadClient, ReloadSink};
pub use debouncer::{DebounceState, Debouncer};
pub use manager::LiveReloadHandle;
pub use watcher::{ChangeKind, EventFilter, SourceWatcher, WatchEvent, run_watch_loop};

pub(crate) use manager::{rebuild_and_notify, spawn};
pub(crate) use stream::reload_stream;
