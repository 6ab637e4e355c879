//! Stores: the handle through which state is read and actions are sent.
//!
//! A root store owns the state tree, the action queue and the table of
//! running effects. Scoped stores derived from it hold no state of their own:
//! they read through a lens and send through an embedding closure, so every
//! store in a tree shares one single writer.
//!
//! ```text
//! Store<App, AppAction>
//!   └─ scope_element(id) ──→ Store<Screen, ScreenAction>
//!        └─ scope_presented() ──→ Store<Detail, DetailAction>
//! ```

mod registry;
mod runtime;
mod task;
mod watcher;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::debug;

use crate::config::StoreConfig;
use crate::metrics::ObservabilityHub;
use crate::mvi::{Action, Reducer, State};
use registry::EffectRegistry;
use runtime::Runtime;
use watcher::read_cloned;

pub use registry::ActiveEffect;
pub use task::SendTask;
pub use watcher::StateWatcher;

/// Visits the current value of a store, or `None` if its scope no longer
/// resolves.
pub(crate) type Reader<S> = Arc<dyn Fn(&mut dyn FnMut(Option<&S>)) + Send + Sync>;

/// Whether a scoped store still points at live state.
pub(crate) type Guard = Arc<dyn Fn() -> bool + Send + Sync>;

type Dispatch<A> = Arc<dyn Fn(A, Option<Guard>) -> SendTask + Send + Sync>;

pub struct Store<S, A> {
    read: Reader<S>,
    dispatch: Dispatch<A>,
    /// `None` for stores that can never go stale.
    validity: Option<Guard>,
    revisions: watch::Receiver<u64>,
    /// Last value read, served once the scope is gone.
    last: Arc<Mutex<S>>,
    registry: Arc<Mutex<EffectRegistry>>,
    hub: ObservabilityHub,
}

impl<S, A> Clone for Store<S, A> {
    fn clone(&self) -> Self {
        Self {
            read: Arc::clone(&self.read),
            dispatch: Arc::clone(&self.dispatch),
            validity: self.validity.clone(),
            revisions: self.revisions.clone(),
            last: Arc::clone(&self.last),
            registry: Arc::clone(&self.registry),
            hub: self.hub.clone(),
        }
    }
}

/// Configures a root store before it starts.
pub struct StoreBuilder<S: State, A: Action> {
    state: S,
    reducer: Box<dyn Reducer<State = S, Action = A>>,
    config: StoreConfig,
    hub: Option<ObservabilityHub>,
    handle: Option<Handle>,
}

impl<S: State, A: Action> StoreBuilder<S, A> {
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Reports events to `hub` instead of a private one.
    pub fn observability(mut self, hub: ObservabilityHub) -> Self {
        self.hub = Some(hub);
        self
    }

    /// Runs effects on `handle`. Defaults to the runtime current at build
    /// time, then to whichever runtime is current when an effect starts.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn build(self) -> Store<S, A> {
        let hub = self
            .hub
            .unwrap_or_else(|| ObservabilityHub::new(self.config.history_capacity));
        let handle = self.handle.or_else(|| Handle::try_current().ok());
        let (sender, revisions) = watch::channel(0u64);
        let registry = Arc::new(Mutex::new(EffectRegistry::default()));
        let last = Arc::new(Mutex::new(self.state.clone()));

        let runtime = Arc::new(Runtime::new(
            self.state,
            self.reducer,
            Arc::clone(&registry),
            sender,
            hub.clone(),
            handle,
            self.config,
        ));

        let read: Reader<S> = {
            let runtime = Arc::clone(&runtime);
            Arc::new(move |visit: &mut dyn FnMut(Option<&S>)| runtime.read(visit))
        };
        let dispatch: Dispatch<A> =
            Arc::new(move |action: A, guard: Option<Guard>| runtime.send(action, guard));

        Store {
            read,
            dispatch,
            validity: None,
            revisions,
            last,
            registry,
            hub,
        }
    }
}

impl<S: State, A: Action> Store<S, A> {
    /// Creates a root store with default configuration.
    pub fn new(state: S, reducer: impl Reducer<State = S, Action = A>) -> Self {
        Self::builder(state, reducer).build()
    }

    pub fn builder(state: S, reducer: impl Reducer<State = S, Action = A>) -> StoreBuilder<S, A> {
        StoreBuilder {
            state,
            reducer: Box::new(reducer),
            config: StoreConfig::default(),
            hub: None,
            handle: None,
        }
    }

    /// Enqueues `action`.
    ///
    /// If the store is idle the action is processed before this returns,
    /// along with every action it chains synchronously. Sends from an invalid
    /// scoped store are dropped and return an already-processed task.
    pub fn send(&self, action: A) -> SendTask {
        if self.is_invalid() {
            debug!(
                action = std::any::type_name::<A>(),
                "Dropping send on a store whose scope is gone"
            );
            return SendTask::noop();
        }
        (self.dispatch)(action, self.validity.clone())
    }

    /// Snapshot of the state.
    ///
    /// For a scoped store whose scope vanished this is the last value it
    /// observed; use [`try_state`](Self::try_state) to tell the difference.
    pub fn state(&self) -> S {
        match self.try_state() {
            Some(state) => {
                *self.last.lock() = state.clone();
                state
            }
            None => self.last.lock().clone(),
        }
    }

    /// Live snapshot, `None` once the scope no longer resolves.
    pub fn try_state(&self) -> Option<S> {
        read_cloned(&self.read)
    }

    /// Reads the live state without cloning it.
    pub fn with_state<R>(&self, read: impl FnOnce(&S) -> R) -> Option<R> {
        let mut read = Some(read);
        let mut output = None;
        (self.read)(&mut |state: Option<&S>| {
            if let (Some(state), Some(read)) = (state, read.take()) {
                output = Some(read(state));
            }
        });
        output
    }

    /// True for a scoped store whose element was popped, dismissed or
    /// replaced. Root stores are never invalid.
    pub fn is_invalid(&self) -> bool {
        self.validity.as_ref().is_some_and(|valid| !valid())
    }

    pub fn subscribe(&self) -> StateWatcher<S> {
        StateWatcher::new(self.revisions.clone(), Arc::clone(&self.read))
    }

    /// Derives a store over a part of this state that always exists.
    pub fn scope<C, CA>(
        &self,
        lens: impl Fn(&S) -> &C + Send + Sync + 'static,
        embed: impl Fn(CA) -> A + Send + Sync + 'static,
    ) -> Store<C, CA>
    where
        C: State,
        CA: Action,
    {
        let initial = lens(&self.state()).clone();
        let parent = Arc::clone(&self.read);
        let read: Reader<C> = Arc::new(move |visit: &mut dyn FnMut(Option<&C>)| {
            parent(&mut |state: Option<&S>| visit(state.map(|state| lens(state))))
        });
        // Only as stale as the store it was derived from.
        let validity = self.validity.as_ref().map(|_| resolves(&read));
        self.derive(read, validity, initial, embed)
    }

    /// Derives a store over a part of this state that may disappear.
    ///
    /// Returns `None` if `lens` does not resolve right now. The derived store
    /// is invalid whenever `lens` does not resolve. Lenses keyed by element
    /// identity never resolve again after removal, so stores for popped
    /// frames and dismissed presentations stay invalid.
    pub fn scope_optional<C, CA>(
        &self,
        lens: impl Fn(&S) -> Option<&C> + Send + Sync + 'static,
        embed: impl Fn(CA) -> A + Send + Sync + 'static,
    ) -> Option<Store<C, CA>>
    where
        C: State,
        CA: Action,
    {
        let parent = Arc::clone(&self.read);
        let read: Reader<C> = Arc::new(move |visit: &mut dyn FnMut(Option<&C>)| {
            parent(&mut |state: Option<&S>| visit(state.and_then(|state| lens(state))))
        });
        let initial = read_cloned(&read)?;
        let validity = resolves(&read);
        Some(self.derive(read, Some(validity), initial, embed))
    }

    /// Effects currently running anywhere in this store's tree.
    pub fn active_effects(&self) -> Vec<ActiveEffect> {
        self.registry.lock().snapshot()
    }

    pub fn observability(&self) -> &ObservabilityHub {
        &self.hub
    }

    fn derive<C, CA>(
        &self,
        read: Reader<C>,
        validity: Option<Guard>,
        initial: C,
        embed: impl Fn(CA) -> A + Send + Sync + 'static,
    ) -> Store<C, CA>
    where
        C: State,
        CA: Action,
    {
        let parent = Arc::clone(&self.dispatch);
        let dispatch: Dispatch<CA> =
            Arc::new(move |action: CA, guard: Option<Guard>| parent(embed(action), guard));
        Store {
            read,
            dispatch,
            validity,
            revisions: self.revisions.clone(),
            last: Arc::new(Mutex::new(initial)),
            registry: Arc::clone(&self.registry),
            hub: self.hub.clone(),
        }
    }
}

fn resolves<C: 'static>(read: &Reader<C>) -> Guard {
    let read = Arc::clone(read);
    Arc::new(move || {
        let mut found = false;
        read(&mut |state: Option<&C>| found = state.is_some());
        found
    })
}
