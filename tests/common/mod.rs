//! Shared test domain and synchronization helpers.

#![allow(dead_code, unused_imports)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use statecraft::case;
use statecraft::effect::{Effect, EffectError};
use statecraft::identified::{ElementId, IdGenerator, IncrementingIds};
use statecraft::metrics::{ObservabilityHub, StoreEvent, StorePlugin};
use statecraft::mvi::{Action, Reducer, State};
use statecraft::navigation::{PresentationAction, PresentationState, StackAction, StackState};
use statecraft::store::{StateWatcher, Store};
use tempfile::TempDir;
use tokio::sync::broadcast;

// -- Test domain --------------------------------------------------------------

/// Broadcast source frames can listen to.
#[derive(Clone)]
pub struct Pulse {
    sender: broadcast::Sender<i64>,
}

impl Pulse {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    /// Returns how many listeners received the value.
    pub fn fire(&self, value: i64) -> usize {
        self.sender.send(value).unwrap_or(0)
    }

    pub fn listeners(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub value: i64,
}

impl State for Frame {}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameAction {
    Listen,
    StopListening,
    Received(i64),
    Bump,
    /// Feeds `Bump` straight back into the queue.
    Echo,
    Fail,
    Panic,
    /// Emits `Bump` after `delay`.
    BumpLater(Duration),
}

impl Action for FrameAction {}

pub struct FrameReducer {
    pulse: Pulse,
}

impl FrameReducer {
    pub fn new(pulse: Pulse) -> Self {
        Self { pulse }
    }
}

impl Reducer for FrameReducer {
    type State = Frame;
    type Action = FrameAction;

    fn reduce(&self, frame: &mut Frame, action: FrameAction) -> Effect<FrameAction> {
        match action {
            FrameAction::Listen => {
                // Subscribe now so values fired after this action is processed
                // are never missed.
                let mut values = self.pulse.sender.subscribe();
                Effect::run(move |emitter| async move {
                    while let Ok(value) = values.recv().await {
                        if !emitter.emit(FrameAction::Received(value)) {
                            break;
                        }
                    }
                    Ok(())
                })
                .cancellable("listen")
            }
            FrameAction::StopListening => Effect::cancel("listen"),
            FrameAction::Received(value) => {
                frame.value += value;
                Effect::none()
            }
            FrameAction::Bump => {
                frame.value += 1;
                Effect::none()
            }
            FrameAction::Echo => Effect::send(FrameAction::Bump),
            FrameAction::Fail => Effect::run(|_| async { Err(EffectError::msg("boom")) }),
            FrameAction::Panic => Effect::run(|_| async { panic!("kaboom") }),
            FrameAction::BumpLater(delay) => Effect::future(async move {
                tokio::time::sleep(delay).await;
                FrameAction::Bump
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Root {
    pub path: StackState<Frame>,
    pub sheet: PresentationState<Frame>,
    /// Values of dismissed sheets, as seen by the root when dismissing.
    pub dismissed: Vec<i64>,
    pub log: Vec<String>,
}

impl State for Root {}

#[derive(Debug, Clone, PartialEq)]
pub enum RootAction {
    Path(StackAction<Frame, FrameAction>),
    Sheet(PresentationAction<FrameAction>),
    Push,
    Present,
    ClearPath,
    Log(String),
}

impl Action for RootAction {}

struct RootReducer {
    ids: Arc<dyn IdGenerator>,
}

impl Reducer for RootReducer {
    type State = Root;
    type Action = RootAction;

    fn reduce(&self, root: &mut Root, action: RootAction) -> Effect<RootAction> {
        match action {
            RootAction::Push => {
                root.path.push(&*self.ids, Frame::default());
                Effect::none()
            }
            RootAction::Present => {
                root.sheet.present(&*self.ids, Frame::default());
                Effect::none()
            }
            RootAction::ClearPath => {
                root.path.set_path(StackState::new());
                Effect::none()
            }
            RootAction::Log(line) => {
                root.log.push(line);
                Effect::none()
            }
            RootAction::Sheet(PresentationAction::Dismiss) => {
                // Still presented: the slot is cleared after this runs.
                if let Some(frame) = root.sheet.get() {
                    root.dismissed.push(frame.value);
                }
                Effect::none()
            }
            RootAction::Sheet(_) | RootAction::Path(_) => Effect::none(),
        }
    }
}

pub fn root_reducer(
    pulse: Pulse,
    ids: Arc<dyn IdGenerator>,
) -> impl Reducer<State = Root, Action = RootAction> {
    RootReducer { ids }
        .for_each(
            |root: &mut Root| &mut root.path,
            case!(RootAction::Path),
            FrameReducer {
                pulse: pulse.clone(),
            },
        )
        .if_let(
            |root: &mut Root| &mut root.sheet,
            case!(RootAction::Sheet),
            FrameReducer { pulse },
        )
}

/// Everything a runtime test needs, wired to one store.
pub struct Fixture {
    pub pulse: Pulse,
    pub gate: Arc<Gate>,
    pub hub: ObservabilityHub,
    pub store: Store<Root, RootAction>,
}

impl Fixture {
    pub fn new() -> Self {
        let pulse = Pulse::new();
        let gate = Arc::new(Gate::default());
        let hub =
            ObservabilityHub::new(128).with_plugins(vec![gate.clone() as Arc<dyn StorePlugin>]);
        let store = Store::builder(
            Root::default(),
            root_reducer(pulse.clone(), Arc::new(IncrementingIds::new())),
        )
        .observability(hub.clone())
        .build();
        Self {
            pulse,
            gate,
            hub,
            store,
        }
    }

    pub fn path(&self) -> Store<StackState<Frame>, StackAction<Frame, FrameAction>> {
        self.store.scope(|root: &Root| &root.path, RootAction::Path)
    }

    pub fn sheet(&self) -> Store<PresentationState<Frame>, PresentationAction<FrameAction>> {
        self.store.scope(|root: &Root| &root.sheet, RootAction::Sheet)
    }

    pub fn element(&self, id: u64, action: FrameAction) -> RootAction {
        RootAction::Path(StackAction::element(ElementId::from(id), action))
    }

    /// Holds the action queue busy: the next processed action blocks the
    /// thread draining the queue until [`Gate::open`]. Returns once the
    /// queue is held.
    pub async fn hold_queue(&self) -> tokio::task::JoinHandle<()> {
        self.gate.arm();
        let store = self.store.clone();
        let holder = tokio::task::spawn_blocking(move || {
            store.send(RootAction::Log("hold".to_string()));
        });
        self.gate.entered().await;
        holder
    }
}

pub fn frame_value(root: &Root, id: u64) -> Option<i64> {
    root.path.get(ElementId::from(id)).map(|frame| frame.value)
}

// -- Synchronization ----------------------------------------------------------

/// Observability plugin that blocks the draining thread once, after the
/// next processed action.
#[derive(Default)]
pub struct Gate {
    armed: AtomicBool,
    state: Mutex<GateState>,
    changed: Condvar,
}

#[derive(Default)]
struct GateState {
    entered: bool,
    open: bool,
}

impl Gate {
    pub fn arm(&self) {
        *self.state.lock() = GateState::default();
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn open(&self) {
        self.state.lock().open = true;
        self.changed.notify_all();
    }

    pub async fn entered(&self) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !self.state.lock().entered {
            assert!(tokio::time::Instant::now() < deadline, "queue was never held");
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    fn hold(&self) {
        let mut state = self.state.lock();
        state.entered = true;
        while !state.open {
            self.changed.wait(&mut state);
        }
    }
}

impl StorePlugin for Gate {
    fn on_event(&self, event: &StoreEvent) {
        if matches!(event, StoreEvent::ActionProcessed { .. })
            && self.armed.swap(false, Ordering::SeqCst)
        {
            self.hold();
        }
    }
}

/// Waits until the watched state satisfies `predicate`, failing the test
/// after a few seconds.
pub async fn eventually<S: State>(
    watcher: &mut StateWatcher<S>,
    predicate: impl FnMut(&S) -> bool,
) -> S {
    tokio::time::timeout(Duration::from_secs(5), watcher.wait_for(predicate))
        .await
        .expect("timed out waiting for state")
        .expect("watched scope went away")
}

/// Polls `condition` until it holds, failing the test after a few seconds.
pub async fn poll_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "condition never held");
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

/// Lets spawned effect tasks run for a moment.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

// -- Config helpers -----------------------------------------------------------

/// Create a temporary config file with the given TOML content.
pub fn temp_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, content).expect("Failed to write config");
    (temp_dir, config_path)
}
