//! Handle returned by `Store::send`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::registry::{EffectRegistry, EffectToken};

/// Bookkeeping for one `send` call and every action it chains synchronously.
pub(crate) struct Chain {
    pending: AtomicUsize,
    notify: Notify,
    effects: Mutex<Vec<(u64, EffectToken)>>,
    registry: Weak<Mutex<EffectRegistry>>,
}

impl Chain {
    pub(crate) fn new(registry: Weak<Mutex<EffectRegistry>>) -> Arc<Self> {
        Arc::new(Self {
            pending: AtomicUsize::new(0),
            notify: Notify::new(),
            effects: Mutex::new(Vec::new()),
            registry,
        })
    }

    pub(crate) fn enqueued(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn processed_one(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }

    pub(crate) fn track(&self, key: u64, token: EffectToken) {
        self.effects.lock().push((key, token));
    }

    fn is_processed(&self) -> bool {
        self.pending.load(Ordering::SeqCst) == 0
    }

    async fn processed(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_processed() {
            return;
        }
        notified.await;
    }
}

/// Tracks the work triggered by one sent action.
///
/// - [`processed`](Self::processed) resolves once the action, and every
///   action it fed back synchronously, has gone through the reducer. Async
///   effects have been started by then.
/// - [`finish`](Self::finish) also waits for those async effects to end.
/// - [`cancel`](Self::cancel) cancels them. Tie a view's lifetime to this
///   handle to get effects that stop when the view goes away.
///
/// Dropping the handle does not cancel anything.
#[derive(Clone)]
pub struct SendTask {
    chain: Option<Arc<Chain>>,
}

impl SendTask {
    pub(crate) fn new(chain: Arc<Chain>) -> Self {
        Self { chain: Some(chain) }
    }

    /// Task for a send that was dropped before reaching the queue.
    pub(crate) fn noop() -> Self {
        Self { chain: None }
    }

    /// `false` when the send was dropped up front (invalid scoped store).
    pub fn was_enqueued(&self) -> bool {
        self.chain.is_some()
    }

    pub fn is_processed(&self) -> bool {
        self.chain.as_ref().map_or(true, |chain| chain.is_processed())
    }

    pub async fn processed(&self) {
        if let Some(chain) = &self.chain {
            chain.processed().await;
        }
    }

    pub async fn finish(&self) {
        let Some(chain) = &self.chain else {
            return;
        };
        chain.processed().await;
        let tokens: Vec<EffectToken> = chain
            .effects
            .lock()
            .iter()
            .map(|(_, token)| token.clone())
            .collect();
        for token in tokens {
            token.finished().await;
        }
    }

    /// Cancels every async effect this send started. Returns how many were
    /// still running.
    pub fn cancel(&self) -> usize {
        let Some(chain) = &self.chain else {
            return 0;
        };
        let effects = std::mem::take(&mut *chain.effects.lock());
        let Some(registry) = chain.registry.upgrade() else {
            effects.iter().for_each(|(_, token)| token.cancel());
            return 0;
        };
        let mut registry = registry.lock();
        effects
            .into_iter()
            .filter(|(key, token)| {
                token.cancel();
                registry.cancel_effect(*key).is_some()
            })
            .count()
    }
}
