//! Rebuild debouncing.
//!
//! Collapses a burst of change signals into a single rebuild. The state is an
//! explicit `{pending, fire_at}` pair: [`Debouncer::schedule`] sets `pending`
//! and pushes `fire_at` to now plus the quiet period; a single timer task
//! ([`Debouncer::run`]) sleeps until `fire_at` and fires once it has passed.
//!
//! The timer task awaits the action before looking at the state again, so at
//! most one action runs at a time, and a signal arriving during a run is
//! honoured once that run completes.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::time::Instant;

/// Snapshot of the debouncer state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebounceState {
    /// An action has been requested and not yet started.
    pub pending: bool,
    /// Earliest time the pending action may start.
    pub fire_at: Option<Instant>,
}

/// Single-action debouncer.
pub struct Debouncer {
    state: Mutex<DebounceState>,
    wake: Notify,
    quiet_period: Duration,
}

impl Debouncer {
    /// Create a debouncer with the given quiet period.
    #[must_use]
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            state: Mutex::new(DebounceState {
                pending: false,
                fire_at: None,
            }),
            wake: Notify::new(),
            quiet_period,
        }
    }

    /// Request the action; restarts the quiet period if already pending.
    pub fn schedule(&self) {
        {
            let mut state = self.lock();
            state.pending = true;
            state.fire_at = Some(Instant::now() + self.quiet_period);
        }
        self.wake.notify_one();
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> DebounceState {
        *self.lock()
    }

    /// Clear `pending` if the action is due at `now`. Returns whether it was.
    fn take_due(&self, now: Instant) -> bool {
        let mut state = self.lock();
        match state.fire_at {
            Some(fire_at) if state.pending && fire_at <= now => {
                state.pending = false;
                state.fire_at = None;
                true
            }
            _ => false,
        }
    }

    /// Timer loop: run `action` once per quiescent burst until `shutdown`
    /// fires or its sender is dropped.
    ///
    /// Shutdown also cancels an action that is in flight.
    pub async fn run<F, Fut>(&self, mut action: F, mut shutdown: watch::Receiver<()>)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        loop {
            let fire_at = self.state().fire_at;

            tokio::select! {
                _ = shutdown.changed() => break,
                () = async {
                    match fire_at {
                        Some(deadline) => tokio::time::sleep_until(deadline).await,
                        None => self.wake.notified().await,
                    }
                } => {}
            }

            if self.take_due(Instant::now()) {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    () = action() => {}
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, DebounceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
