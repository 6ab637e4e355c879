//! The root store's action loop and effect supervisor.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{debug, error, trace, warn};

use super::registry::{ActiveEffect, EffectRegistry, EffectToken};
use super::task::{Chain, SendTask};
use super::Guard;
use crate::config::StoreConfig;
use crate::effect::{
    BoxFuture, CancelKey, Effect, EffectError, EffectId, Emitter, Job, Operation, OwnerPath, Task,
};
use crate::metrics::{DropReason, ObservabilityHub, StoreEvent};
use crate::mvi::{Action, Reducer, State};

/// An action waiting to be reduced.
struct Queued<A> {
    action: A,
    /// Effect that emitted the action. Dropped if that effect is cancelled
    /// before the action is processed.
    origin: Option<EffectToken>,
    /// Validity of the scoped store the action was sent through.
    guard: Option<Guard>,
    /// Subtree that fed the action back synchronously. Cancelling that
    /// subtree removes the action from the queue.
    owner: OwnerPath,
    chain: Option<Arc<Chain>>,
}

struct ActionQueue<A> {
    pending: VecDeque<Queued<A>>,
    draining: bool,
}

/// Single writer for one state tree.
///
/// Actions are processed one at a time, in arrival order, by whichever caller
/// finds the queue idle. Everyone else only enqueues.
pub(crate) struct Runtime<S: State, A: Action> {
    state: RwLock<S>,
    reducer: Box<dyn Reducer<State = S, Action = A>>,
    queue: Mutex<ActionQueue<A>>,
    registry: Arc<Mutex<EffectRegistry>>,
    revisions: watch::Sender<u64>,
    hub: ObservabilityHub,
    handle: Option<Handle>,
    config: StoreConfig,
}

impl<S: State, A: Action> Runtime<S, A> {
    pub(crate) fn new(
        state: S,
        reducer: Box<dyn Reducer<State = S, Action = A>>,
        registry: Arc<Mutex<EffectRegistry>>,
        revisions: watch::Sender<u64>,
        hub: ObservabilityHub,
        handle: Option<Handle>,
        config: StoreConfig,
    ) -> Self {
        Self {
            state: RwLock::new(state),
            reducer,
            queue: Mutex::new(ActionQueue {
                pending: VecDeque::new(),
                draining: false,
            }),
            registry,
            revisions,
            hub,
            handle,
            config,
        }
    }

    pub(crate) fn read(&self, visit: &mut dyn FnMut(Option<&S>)) {
        let state = self.state.read();
        visit(Some(&*state));
    }

    pub(crate) fn send(self: &Arc<Self>, action: A, guard: Option<Guard>) -> SendTask {
        let chain = Chain::new(Arc::downgrade(&self.registry));
        chain.enqueued();
        self.enqueue(Queued {
            action,
            origin: None,
            guard,
            owner: OwnerPath::root(),
            chain: Some(Arc::clone(&chain)),
        });
        self.drain();
        SendTask::new(chain)
    }

    fn enqueue(&self, queued: Queued<A>) {
        let depth = {
            let mut queue = self.queue.lock();
            queue.pending.push_back(queued);
            queue.pending.len()
        };
        if depth == self.config.queue_warn_threshold {
            warn!(depth, "Action queue is backing up");
        }
    }

    /// Processes queued actions until the queue is empty, unless another
    /// caller is already doing so.
    fn drain(self: &Arc<Self>) {
        {
            let mut queue = self.queue.lock();
            if queue.draining {
                return;
            }
            queue.draining = true;
        }
        // A panicking reducer must not leave the queue marked busy forever.
        let reset = scopeguard::guard((), |_| self.queue.lock().draining = false);

        loop {
            let next = {
                let mut queue = self.queue.lock();
                match queue.pending.pop_front() {
                    Some(next) => next,
                    None => {
                        // Cleared under the same lock that enqueue takes, so a
                        // concurrent sender either lands in this loop or drains
                        // itself.
                        queue.draining = false;
                        break;
                    }
                }
            };
            self.process(next);
        }

        scopeguard::ScopeGuard::into_inner(reset);
    }

    fn process(self: &Arc<Self>, queued: Queued<A>) {
        let Queued {
            action,
            origin,
            guard,
            chain,
            ..
        } = queued;
        let _settled = scopeguard::guard(chain.clone(), |chain| {
            if let Some(chain) = chain {
                chain.processed_one();
            }
        });
        let action_name = std::any::type_name::<A>();

        if origin.as_ref().is_some_and(EffectToken::is_cancelled) {
            trace!(action = action_name, "Dropping output of a cancelled effect");
            self.hub.record(StoreEvent::ActionDropped {
                action: action_name,
                reason: DropReason::CancelledEffect,
            });
            return;
        }
        if let Some(guard) = &guard {
            if !guard() {
                debug!(action = action_name, "Dropping action sent through a stale scope");
                self.hub.record(StoreEvent::ActionDropped {
                    action: action_name,
                    reason: DropReason::StaleScope,
                });
                return;
            }
        }

        let effect = {
            let mut state = self.state.write();
            self.reducer.reduce(&mut state, action)
        };
        self.revisions.send_modify(|revision| *revision += 1);
        self.hub.record(StoreEvent::ActionProcessed {
            action: action_name,
        });

        self.start(effect, chain.as_ref());
    }

    fn start(self: &Arc<Self>, effect: Effect<A>, chain: Option<&Arc<Chain>>) {
        // Starting an effect under a cancellation id replaces whatever was
        // registered under it, but never another task of this same batch.
        let mut replaced: Vec<CancelKey> = Vec::new();
        for op in &effect.ops {
            if let Operation::Run(Task {
                id: Some(id),
                owner,
                ..
            }) = op
            {
                let key = CancelKey {
                    owner: owner.clone(),
                    id: id.clone(),
                };
                if !replaced.contains(&key) {
                    replaced.push(key);
                }
            }
        }
        for key in &replaced {
            self.cancel_key(key);
        }

        for op in effect.ops {
            match op {
                Operation::Send(action, owner) => {
                    if let Some(chain) = chain {
                        chain.enqueued();
                    }
                    self.enqueue(Queued {
                        action,
                        origin: None,
                        guard: None,
                        owner,
                        chain: chain.cloned(),
                    });
                }
                Operation::Run(task) => self.spawn(task, chain),
                Operation::Cancel(key) => self.cancel_key(&key),
                Operation::CancelOwner(owner) => self.cancel_owner(&owner),
            }
        }
    }

    fn spawn(self: &Arc<Self>, task: Task<A>, chain: Option<&Arc<Chain>>) {
        let Task { id, owner, job } = task;

        let Some(handle) = self.handle.clone().or_else(|| Handle::try_current().ok()) else {
            self.report_failure(owner, id, EffectError::NoRuntime);
            return;
        };

        let token = EffectToken::new();
        let cancel_key = id.clone().map(|id| CancelKey {
            owner: owner.clone(),
            id,
        });
        let key = self
            .registry
            .lock()
            .register(owner.clone(), cancel_key, token.clone());
        if let Some(chain) = chain {
            chain.track(key, token.clone());
        }
        trace!(owner = %owner, id = ?id.as_ref().map(|id| id.as_str()), "Starting effect");
        self.hub.record(StoreEvent::EffectStarted { owner, id });

        let runtime = Arc::downgrade(self);
        let emitter = self.emitter(token.clone());
        let work: BoxFuture<Result<(), EffectError>> = match job {
            Job::Future(producer) => producer(emitter),
            Job::Sequence(effects) => Self::run_sequence(effects, emitter, runtime.clone()),
        };

        let inner = handle.spawn(work);
        token.attach(inner.abort_handle());
        handle.spawn(async move {
            let outcome = inner.await;
            match runtime.upgrade() {
                Some(runtime) => runtime.effect_ended(key, &token, outcome),
                None => token.finish(),
            }
        });
    }

    /// Emitter bound to one running effect.
    fn emitter(self: &Arc<Self>, token: EffectToken) -> Emitter<A> {
        let runtime = Arc::downgrade(self);
        Emitter::new(move |action: A| {
            if token.is_cancelled() {
                return false;
            }
            let Some(runtime) = runtime.upgrade() else {
                return false;
            };
            runtime.enqueue(Queued {
                action,
                origin: Some(token.clone()),
                guard: None,
                owner: OwnerPath::root(),
                chain: None,
            });
            runtime.drain();
            true
        })
    }

    /// Runs concatenated effects one after another inside a single task.
    ///
    /// Nested tasks run under the sequence's registration, so cancelling the
    /// sequence stops whatever step is running and skips the rest.
    fn run_sequence(
        effects: Vec<Effect<A>>,
        emitter: Emitter<A>,
        runtime: Weak<Self>,
    ) -> BoxFuture<Result<(), EffectError>> {
        Box::pin(async move {
            for effect in effects {
                for op in effect.ops {
                    match op {
                        Operation::Send(action, _) => {
                            if !emitter.emit(action) {
                                return Ok(());
                            }
                        }
                        Operation::Run(task) => match task.job {
                            Job::Future(producer) => producer(emitter.clone()).await?,
                            Job::Sequence(steps) => {
                                Self::run_sequence(steps, emitter.clone(), runtime.clone()).await?
                            }
                        },
                        Operation::Cancel(key) => {
                            if let Some(runtime) = runtime.upgrade() {
                                runtime.cancel_key(&key);
                            }
                        }
                        Operation::CancelOwner(owner) => {
                            if let Some(runtime) = runtime.upgrade() {
                                runtime.cancel_owner(&owner);
                            }
                        }
                    }
                }
            }
            Ok(())
        })
    }

    fn effect_ended(
        &self,
        key: u64,
        token: &EffectToken,
        outcome: Result<Result<(), EffectError>, JoinError>,
    ) {
        let entry = self.registry.lock().finish(key);
        token.finish();
        // Already cancelled: the cancellation was recorded when it happened.
        let Some(ActiveEffect { owner, id }) = entry else {
            return;
        };

        match outcome {
            Ok(Ok(())) => {
                trace!(owner = %owner, "Effect finished");
                self.hub.record(StoreEvent::EffectFinished { owner, id });
            }
            Ok(Err(err)) => self.report_failure(owner, id, err),
            Err(join) if join.is_panic() => {
                let err = EffectError::Panicked {
                    message: panic_message(join.into_panic()),
                };
                self.report_failure(owner, id, err);
            }
            Err(_) => {}
        }
    }

    fn report_failure(&self, owner: OwnerPath, id: Option<EffectId>, err: EffectError) {
        match &err {
            EffectError::Failed(_) => warn!(owner = %owner, error = %err, "Effect failed"),
            EffectError::Panicked { .. } | EffectError::NoRuntime => {
                error!(owner = %owner, error = %err, "Effect aborted")
            }
        }
        self.hub.record(StoreEvent::EffectFailed {
            owner,
            id,
            kind: err.kind(),
            message: err.to_string(),
        });
    }

    pub(crate) fn cancel_key(&self, key: &CancelKey) {
        let cancelled = self.registry.lock().cancel_key(key);
        self.record_cancelled(cancelled);
    }

    pub(crate) fn cancel_owner(&self, owner: &OwnerPath) {
        let cancelled = self.registry.lock().cancel_owner(owner);
        if !cancelled.is_empty() {
            debug!(owner = %owner, count = cancelled.len(), "Cancelled effects of removed scope");
        }
        self.record_cancelled(cancelled);
        self.discard_queued(owner);
    }

    /// Removes queued actions fed back by `owner` or anything nested under it.
    fn discard_queued(&self, owner: &OwnerPath) {
        if owner.is_root() {
            return;
        }
        let discarded: VecDeque<Queued<A>> = {
            let mut queue = self.queue.lock();
            let (discarded, kept) = std::mem::take(&mut queue.pending)
                .into_iter()
                .partition(|queued: &Queued<A>| {
                    !queued.owner.is_root() && queued.owner.starts_with(owner)
                });
            queue.pending = kept;
            discarded
        };

        let action_name = std::any::type_name::<A>();
        for queued in discarded {
            trace!(owner = %queued.owner, "Dropping queued action of a removed scope");
            self.hub.record(StoreEvent::ActionDropped {
                action: action_name,
                reason: DropReason::CancelledEffect,
            });
            if let Some(chain) = queued.chain {
                chain.processed_one();
            }
        }
    }

    fn record_cancelled(&self, cancelled: Vec<ActiveEffect>) {
        for ActiveEffect { owner, id } in cancelled {
            trace!(owner = %owner, "Effect cancelled");
            self.hub.record(StoreEvent::EffectCancelled { owner, id });
        }
    }
}

impl<S: State, A: Action> Drop for Runtime<S, A> {
    fn drop(&mut self) {
        let cancelled = self.registry.lock().cancel_all();
        if cancelled > 0 {
            debug!(cancelled, "Store dropped, cancelled running effects");
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
