//! Active-effect table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::AbortHandle;

use crate::effect::{CancelKey, EffectId, OwnerPath};

/// Cancellation and completion state shared by a running effect, its emitter,
/// the registry and any [`SendTask`](super::SendTask) waiting on it.
#[derive(Clone)]
pub(crate) struct EffectToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    cancelled: AtomicBool,
    finished: AtomicBool,
    notify: Notify,
    abort: Mutex<Option<AbortHandle>>,
}

impl EffectToken {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                finished: AtomicBool::new(false),
                notify: Notify::new(),
                abort: Mutex::new(None),
            }),
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn attach(&self, abort: AbortHandle) {
        if self.is_cancelled() {
            abort.abort();
            return;
        }
        *self.inner.abort.lock() = Some(abort);
    }

    /// Stops the effect. Its emitter rejects everything from now on and any
    /// of its actions still sitting in the queue are dropped.
    pub(crate) fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(abort) = self.inner.abort.lock().take() {
            abort.abort();
        }
        self.finish();
    }

    pub(crate) fn finish(&self) {
        if !self.inner.finished.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub(crate) async fn finished(&self) {
        // Register with Notify before checking the flag, otherwise a finish()
        // between the check and the await is lost.
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.inner.finished.load(Ordering::SeqCst) {
            return;
        }
        notified.await;
    }
}

/// Public view of one running effect.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveEffect {
    pub owner: OwnerPath,
    pub id: Option<EffectId>,
}

struct RunningEffect {
    owner: OwnerPath,
    cancel_key: Option<CancelKey>,
    token: EffectToken,
}

/// Maps every running effect to its owner and cancellation key.
#[derive(Default)]
pub(crate) struct EffectRegistry {
    next_key: u64,
    running: HashMap<u64, RunningEffect>,
    by_cancel_key: HashMap<CancelKey, Vec<u64>>,
}

impl EffectRegistry {
    pub(crate) fn register(
        &mut self,
        owner: OwnerPath,
        cancel_key: Option<CancelKey>,
        token: EffectToken,
    ) -> u64 {
        let key = self.next_key;
        self.next_key += 1;
        if let Some(cancel_key) = &cancel_key {
            self.by_cancel_key
                .entry(cancel_key.clone())
                .or_default()
                .push(key);
        }
        self.running.insert(
            key,
            RunningEffect {
                owner,
                cancel_key,
                token,
            },
        );
        key
    }

    /// Removes a finished effect without cancelling it.
    pub(crate) fn finish(&mut self, key: u64) -> Option<ActiveEffect> {
        let entry = self.remove(key)?;
        Some(ActiveEffect {
            owner: entry.owner,
            id: entry.cancel_key.map(|cancel_key| cancel_key.id),
        })
    }

    pub(crate) fn cancel_effect(&mut self, key: u64) -> Option<ActiveEffect> {
        let entry = self.remove(key)?;
        entry.token.cancel();
        Some(ActiveEffect {
            owner: entry.owner,
            id: entry.cancel_key.map(|cancel_key| cancel_key.id),
        })
    }

    pub(crate) fn cancel_key(&mut self, cancel_key: &CancelKey) -> Vec<ActiveEffect> {
        let keys = self.by_cancel_key.remove(cancel_key).unwrap_or_default();
        keys.into_iter()
            .filter_map(|key| self.cancel_effect(key))
            .collect()
    }

    pub(crate) fn cancel_owner(&mut self, owner: &OwnerPath) -> Vec<ActiveEffect> {
        let keys: Vec<u64> = self
            .running
            .iter()
            .filter(|(_, entry)| entry.owner.starts_with(owner))
            .map(|(key, _)| *key)
            .collect();
        keys.into_iter()
            .filter_map(|key| self.cancel_effect(key))
            .collect()
    }

    pub(crate) fn cancel_all(&mut self) -> usize {
        let keys: Vec<u64> = self.running.keys().copied().collect();
        keys.into_iter()
            .filter_map(|key| self.cancel_effect(key))
            .count()
    }

    pub(crate) fn snapshot(&self) -> Vec<ActiveEffect> {
        let mut entries: Vec<(&u64, &RunningEffect)> = self.running.iter().collect();
        entries.sort_by_key(|(key, _)| **key);
        entries
            .into_iter()
            .map(|(_, entry)| ActiveEffect {
                owner: entry.owner.clone(),
                id: entry.cancel_key.as_ref().map(|cancel_key| cancel_key.id.clone()),
            })
            .collect()
    }

    fn remove(&mut self, key: u64) -> Option<RunningEffect> {
        let entry = self.running.remove(&key)?;
        if let Some(cancel_key) = &entry.cancel_key {
            if let Some(keys) = self.by_cancel_key.get_mut(cancel_key) {
                keys.retain(|existing| *existing != key);
                if keys.is_empty() {
                    self.by_cancel_key.remove(cancel_key);
                }
            }
        }
        Some(entry)
    }
}
