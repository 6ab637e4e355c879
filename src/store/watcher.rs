//! Push-based observation of a store's (possibly scoped) state.

use tokio::sync::watch;

use super::Reader;
use crate::mvi::State;

/// Receives state changes of a store.
///
/// Every committed reduction bumps a revision counter; the watcher wakes on
/// it, reads its own slice through the scope's lens, and only reports values
/// that differ from the last one it returned. Intermediate states may be
/// coalesced when several actions are processed before the watcher runs.
pub struct StateWatcher<S> {
    revisions: watch::Receiver<u64>,
    read: Reader<S>,
    last: Option<S>,
}

impl<S: State> StateWatcher<S> {
    pub(crate) fn new(mut revisions: watch::Receiver<u64>, read: Reader<S>) -> Self {
        revisions.borrow_and_update();
        let last = read_cloned(&read);
        Self {
            revisions,
            read,
            last,
        }
    }

    /// Live value, `None` once the scope no longer resolves.
    pub fn current(&self) -> Option<S> {
        read_cloned(&self.read)
    }

    /// Waits for the next distinct value.
    ///
    /// Returns `None` once the watched scope vanished (popped frame,
    /// dismissed presentation).
    pub async fn changed(&mut self) -> Option<S> {
        loop {
            if self.revisions.changed().await.is_err() {
                return None;
            }
            let next = read_cloned(&self.read)?;
            if self.last.as_ref() != Some(&next) {
                self.last = Some(next.clone());
                return Some(next);
            }
        }
    }

    /// Waits until the state satisfies `predicate`, checking the current
    /// value first.
    pub async fn wait_for(&mut self, mut predicate: impl FnMut(&S) -> bool) -> Option<S> {
        let current = self.current()?;
        if predicate(&current) {
            self.last = Some(current.clone());
            return Some(current);
        }
        loop {
            let next = self.changed().await?;
            if predicate(&next) {
                return Some(next);
            }
        }
    }
}

pub(crate) fn read_cloned<S: Clone>(read: &Reader<S>) -> Option<S> {
    let mut value = None;
    read(&mut |state: Option<&S>| value = state.cloned());
    value
}
