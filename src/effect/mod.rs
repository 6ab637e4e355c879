//! Effects: cancellable, identified producers of follow-up actions.
//!
//! A reducer returns an [`Effect`] describing the work it wants done. The
//! store interprets it after the state change is committed:
//!
//! ```text
//! reduce(state, action) ──→ Effect ──→ Store ──→ tokio task ──→ Emitter ──→ send
//! ```
//!
//! Effects carry an [`OwnerPath`] so that work started on behalf of a stack
//! frame or a presented sheet dies with it.

mod emitter;
mod error;
mod identity;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_core::Stream;

pub use emitter::Emitter;
pub use error::EffectError;
pub use identity::{CancelKey, EffectId, OwnerPath, ScopeSegment};

pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
pub(crate) type Producer<A> =
    Box<dyn FnOnce(Emitter<A>) -> BoxFuture<Result<(), EffectError>> + Send>;

/// Work a reducer asks the store to perform.
#[must_use = "effects do nothing unless returned to the store"]
pub struct Effect<A> {
    pub(crate) ops: Vec<Operation<A>>,
}

pub(crate) enum Operation<A> {
    /// Feed an action straight back into the queue, in the same processing turn.
    /// It is dropped if its owner is cancelled before it is processed.
    Send(A, OwnerPath),
    /// Start asynchronous work.
    Run(Task<A>),
    Cancel(CancelKey),
    CancelOwner(OwnerPath),
}

pub(crate) struct Task<A> {
    pub(crate) id: Option<EffectId>,
    pub(crate) owner: OwnerPath,
    pub(crate) job: Job<A>,
}

pub(crate) enum Job<A> {
    Future(Producer<A>),
    /// Sub-effects run one after another inside a single task.
    Sequence(Vec<Effect<A>>),
}

impl<A: Send + 'static> Effect<A> {
    pub fn none() -> Self {
        Self { ops: Vec::new() }
    }

    /// Immediately processes `action` after the current one.
    pub fn send(action: A) -> Self {
        Self {
            ops: vec![Operation::Send(action, OwnerPath::root())],
        }
    }

    /// Long-living or one-shot async work that may emit any number of actions.
    pub fn run<F, Fut>(operation: F) -> Self
    where
        F: FnOnce(Emitter<A>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), EffectError>> + Send + 'static,
    {
        let producer: Producer<A> = Box::new(move |emitter| Box::pin(operation(emitter)));
        Self::task(Job::Future(producer))
    }

    /// Async work that resolves to exactly one action.
    pub fn future<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = A> + Send + 'static,
    {
        Self::run(move |emitter| async move {
            emitter.emit(future.await);
            Ok(())
        })
    }

    /// Forwards every item of `stream` until it ends or the effect is cancelled.
    ///
    /// The stream does not need to be restartable: restarting a subscription
    /// means registering a new effect under the same [`EffectId`].
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = A> + Send + 'static,
    {
        Self::run(move |emitter| async move {
            let mut stream = Box::pin(stream);
            while let Some(action) =
                std::future::poll_fn(|cx| stream.as_mut().poll_next(cx)).await
            {
                if !emitter.emit(action) {
                    break;
                }
            }
            Ok(())
        })
    }

    /// Runs all effects concurrently.
    pub fn merge(effects: impl IntoIterator<Item = Effect<A>>) -> Self {
        Self {
            ops: effects.into_iter().flat_map(|effect| effect.ops).collect(),
        }
    }

    /// Runs effects one after another in a single task.
    pub fn concatenate(effects: impl IntoIterator<Item = Effect<A>>) -> Self {
        let effects: Vec<_> = effects
            .into_iter()
            .filter(|effect| !effect.is_none())
            .collect();
        if effects.is_empty() {
            return Self::none();
        }
        Self::task(Job::Sequence(effects))
    }

    /// Cancels the running effect registered under `id` in the same owner.
    pub fn cancel(id: impl Into<EffectId>) -> Self {
        Self {
            ops: vec![Operation::Cancel(CancelKey {
                owner: OwnerPath::root(),
                id: id.into(),
            })],
        }
    }

    /// Cancels every effect owned by `owner` or anything nested under it.
    pub fn cancel_owner(owner: OwnerPath) -> Self {
        Self {
            ops: vec![Operation::CancelOwner(owner)],
        }
    }

    pub fn merge_with(mut self, other: Effect<A>) -> Self {
        self.ops.extend(other.ops);
        self
    }

    /// Registers the async parts of this effect under `id`.
    ///
    /// Starting it cancels whatever was previously registered under the same
    /// id and owner.
    pub fn cancellable(mut self, id: impl Into<EffectId>) -> Self {
        let id = id.into();
        for op in &mut self.ops {
            if let Operation::Run(task) = op {
                task.id = Some(id.clone());
            }
        }
        self
    }

    /// Converts produced actions into the parent action type.
    pub fn map<B: Send + 'static>(
        self,
        embed: impl Fn(A) -> B + Send + Sync + 'static,
    ) -> Effect<B> {
        self.map_arc(Arc::new(embed))
    }

    pub(crate) fn map_arc<B: Send + 'static>(
        self,
        embed: Arc<dyn Fn(A) -> B + Send + Sync>,
    ) -> Effect<B> {
        let ops = self
            .ops
            .into_iter()
            .map(|op| match op {
                Operation::Send(action, owner) => Operation::Send(embed(action), owner),
                Operation::Run(task) => Operation::Run(Task {
                    id: task.id,
                    owner: task.owner,
                    job: match task.job {
                        Job::Future(producer) => {
                            let embed = Arc::clone(&embed);
                            let mapped: Producer<B> = Box::new(move |emitter: Emitter<B>| {
                                producer(emitter.embedding(embed))
                            });
                            Job::Future(mapped)
                        }
                        Job::Sequence(effects) => Job::Sequence(
                            effects
                                .into_iter()
                                .map(|effect| effect.map_arc(Arc::clone(&embed)))
                                .collect(),
                        ),
                    },
                }),
                Operation::Cancel(key) => Operation::Cancel(key),
                Operation::CancelOwner(owner) => Operation::CancelOwner(owner),
            })
            .collect();
        Effect { ops }
    }

    /// Moves every operation under `segment`: its tasks and immediate actions
    /// become owned by that subtree and its cancellation ids are namespaced
    /// by it.
    pub fn scoped_to(mut self, segment: ScopeSegment) -> Self {
        for op in &mut self.ops {
            match op {
                Operation::Send(_, owner) => owner.prepend(segment),
                Operation::Run(task) => {
                    task.owner.prepend(segment);
                    if let Job::Sequence(effects) = &mut task.job {
                        let inner = std::mem::take(effects);
                        *effects = inner
                            .into_iter()
                            .map(|effect| effect.scoped_to(segment))
                            .collect();
                    }
                }
                Operation::Cancel(key) => key.owner.prepend(segment),
                Operation::CancelOwner(owner) => owner.prepend(segment),
            }
        }
        self
    }

    pub fn is_none(&self) -> bool {
        self.ops.is_empty()
    }

    /// Actions this effect feeds back synchronously.
    pub fn immediate_actions(&self) -> impl Iterator<Item = &A> + '_ {
        self.ops.iter().filter_map(|op| match op {
            Operation::Send(action, _) => Some(action),
            _ => None,
        })
    }

    /// Owners of the async tasks this effect starts, in order.
    pub fn task_owners(&self) -> Vec<&OwnerPath> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Operation::Run(task) => Some(&task.owner),
                _ => None,
            })
            .collect()
    }

    /// Owners this effect cancels wholesale.
    pub fn cancelled_owners(&self) -> Vec<&OwnerPath> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Operation::CancelOwner(owner) => Some(owner),
                _ => None,
            })
            .collect()
    }

    pub fn cancelled_keys(&self) -> Vec<&CancelKey> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Operation::Cancel(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    fn task(job: Job<A>) -> Self {
        Self {
            ops: vec![Operation::Run(Task {
                id: None,
                owner: OwnerPath::root(),
                job,
            })],
        }
    }
}

impl<A: Send + 'static> Default for Effect<A> {
    fn default() -> Self {
        Self::none()
    }
}

impl<A> std::fmt::Debug for Effect<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_list();
        for op in &self.ops {
            match op {
                Operation::Send(_, owner) => {
                    list.entry(&format_args!("send(owner={})", owner))
                }
                Operation::Run(task) => list.entry(&format_args!(
                    "run(owner={}, id={:?})",
                    task.owner,
                    task.id.as_ref().map(EffectId::as_str)
                )),
                Operation::Cancel(key) => list.entry(&format_args!("cancel({})", key)),
                Operation::CancelOwner(owner) => {
                    list.entry(&format_args!("cancel_owner({})", owner))
                }
            };
        }
        list.finish()
    }
}
