//! Store observability: recent events, counters and plugin hooks.
//!
//! The runtime reports what it does (actions processed or dropped, effects
//! started, cancelled, finished or failed) to an [`ObservabilityHub`]. The
//! hub keeps a bounded history and fans events out to [`StorePlugin`]s, the
//! hook external collaborators use to surface effect failures.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;

use crate::effect::{EffectId, OwnerPath};

/// Why an action never reached the reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Emitted by an effect, or fed back by a subtree, that was cancelled
    /// before the action was processed.
    CancelledEffect,
    /// Sent through a scoped store whose element is gone.
    StaleScope,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    ActionProcessed {
        action: &'static str,
    },
    ActionDropped {
        action: &'static str,
        reason: DropReason,
    },
    EffectStarted {
        owner: OwnerPath,
        id: Option<EffectId>,
    },
    EffectCancelled {
        owner: OwnerPath,
        id: Option<EffectId>,
    },
    EffectFinished {
        owner: OwnerPath,
        id: Option<EffectId>,
    },
    EffectFailed {
        owner: OwnerPath,
        id: Option<EffectId>,
        kind: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventRecord {
    pub at: SystemTime,
    pub event: StoreEvent,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoreCounters {
    pub actions_processed: u64,
    pub actions_dropped: u64,
    pub effects_started: u64,
    pub effects_cancelled: u64,
    pub effects_finished: u64,
    pub effects_failed: u64,
}

#[derive(Debug, Clone)]
pub struct StoreMetrics {
    pub generated_at: SystemTime,
    pub counters: StoreCounters,
    pub recent: Vec<EventRecord>,
}

pub trait StorePlugin: Send + Sync {
    fn on_event(&self, _event: &StoreEvent) {}
}

#[derive(Clone)]
pub struct ObservabilityHub {
    inner: Arc<ObservabilityInner>,
}

struct ObservabilityInner {
    ring: EventRingBuffer,
    counters: Counters,
    plugins: RwLock<Vec<Arc<dyn StorePlugin>>>,
}

impl ObservabilityHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(ObservabilityInner {
                ring: EventRingBuffer::new(capacity),
                counters: Counters::default(),
                plugins: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Adds `plugins`. Clones of this hub share them.
    pub fn with_plugins(self, plugins: Vec<Arc<dyn StorePlugin>>) -> Self {
        self.inner.plugins.write().extend(plugins);
        self
    }

    pub fn record(&self, event: StoreEvent) {
        self.inner.counters.count(&event);
        // Plugins may block; call them without holding the list lock.
        let plugins = self.inner.plugins.read().clone();
        for plugin in &plugins {
            plugin.on_event(&event);
        }
        self.inner.ring.push(EventRecord {
            at: SystemTime::now(),
            event,
        });
    }

    pub fn snapshot(&self) -> StoreMetrics {
        StoreMetrics {
            generated_at: SystemTime::now(),
            counters: self.inner.counters.snapshot(),
            recent: self.inner.ring.snapshot(),
        }
    }
}

impl Default for ObservabilityHub {
    fn default() -> Self {
        Self::new(256)
    }
}

#[derive(Default)]
struct Counters {
    actions_processed: AtomicU64,
    actions_dropped: AtomicU64,
    effects_started: AtomicU64,
    effects_cancelled: AtomicU64,
    effects_finished: AtomicU64,
    effects_failed: AtomicU64,
}

impl Counters {
    fn count(&self, event: &StoreEvent) {
        let counter = match event {
            StoreEvent::ActionProcessed { .. } => &self.actions_processed,
            StoreEvent::ActionDropped { .. } => &self.actions_dropped,
            StoreEvent::EffectStarted { .. } => &self.effects_started,
            StoreEvent::EffectCancelled { .. } => &self.effects_cancelled,
            StoreEvent::EffectFinished { .. } => &self.effects_finished,
            StoreEvent::EffectFailed { .. } => &self.effects_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> StoreCounters {
        StoreCounters {
            actions_processed: self.actions_processed.load(Ordering::Relaxed),
            actions_dropped: self.actions_dropped.load(Ordering::Relaxed),
            effects_started: self.effects_started.load(Ordering::Relaxed),
            effects_cancelled: self.effects_cancelled.load(Ordering::Relaxed),
            effects_finished: self.effects_finished.load(Ordering::Relaxed),
            effects_failed: self.effects_failed.load(Ordering::Relaxed),
        }
    }
}

struct EventRingBuffer {
    capacity: usize,
    records: RwLock<VecDeque<EventRecord>>,
}

impl EventRingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    fn push(&self, record: EventRecord) {
        if self.capacity == 0 {
            return;
        }
        let mut records = self.records.write();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    fn snapshot(&self) -> Vec<EventRecord> {
        self.records.read().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FailureSpy {
        failures: Mutex<Vec<String>>,
    }

    impl StorePlugin for FailureSpy {
        fn on_event(&self, event: &StoreEvent) {
            if let StoreEvent::EffectFailed { message, .. } = event {
                self.failures.lock().push(message.clone());
            }
        }
    }

    #[test]
    fn ring_keeps_most_recent_events() {
        let hub = ObservabilityHub::new(2);
        for action in ["a", "b", "c"] {
            hub.record(StoreEvent::ActionProcessed { action });
        }

        let snapshot = hub.snapshot();
        let actions: Vec<_> = snapshot
            .recent
            .iter()
            .map(|record| record.event.clone())
            .collect();
        assert_eq!(
            actions,
            vec![
                StoreEvent::ActionProcessed { action: "b" },
                StoreEvent::ActionProcessed { action: "c" },
            ]
        );
        assert_eq!(snapshot.counters.actions_processed, 3);
    }

    #[test]
    fn plugins_see_failures() {
        let spy = Arc::new(FailureSpy::default());
        let hub =
            ObservabilityHub::new(8).with_plugins(vec![spy.clone() as Arc<dyn StorePlugin>]);

        hub.record(StoreEvent::EffectFailed {
            owner: OwnerPath::root(),
            id: None,
            kind: "failed",
            message: "socket closed".to_string(),
        });

        assert_eq!(spy.failures.lock().as_slice(), ["socket closed".to_string()]);
        assert_eq!(hub.snapshot().counters.effects_failed, 1);
    }

    #[test]
    fn plugins_added_after_cloning_are_shared() {
        let spy = Arc::new(FailureSpy::default());
        let hub = ObservabilityHub::new(8);
        let shared = hub.clone();

        let hub = hub.with_plugins(vec![spy.clone() as Arc<dyn StorePlugin>]);
        shared.record(StoreEvent::EffectFailed {
            owner: OwnerPath::root(),
            id: None,
            kind: "failed",
            message: "late".to_string(),
        });

        assert_eq!(spy.failures.lock().as_slice(), ["late".to_string()]);
        assert_eq!(hub.snapshot().counters.effects_failed, 1);
    }
}
