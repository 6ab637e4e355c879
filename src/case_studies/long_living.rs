//! Long-living effects: a screen that counts screenshots while it is alive.
//!
//! The counter screen subscribes to a [`ScreenshotSource`] when it receives
//! `Task`. The subscription belongs to the screen's stack frame, so replacing
//! or popping the frame ends it, and a detail screen shown instead does not
//! count anything.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::case;
use crate::effect::Effect;
use crate::identified::{ElementId, IdGenerator};
use crate::mvi::{Action, Reducer, State};
use crate::navigation::{StackAction, StackState};

/// Broadcasts "a screenshot was taken" to every subscriber.
#[derive(Clone)]
pub struct ScreenshotSource {
    sender: broadcast::Sender<()>,
}

impl ScreenshotSource {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    /// Notifies subscribers. Returns how many received it.
    pub fn take_screenshot(&self) -> usize {
        self.sender.send(()).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ScreenshotSource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LongLivingState {
    pub screenshot_count: u32,
}

impl State for LongLivingState {}

#[derive(Debug, Clone, PartialEq)]
pub enum LongLivingAction {
    /// The screen appeared: start listening for screenshots.
    Task,
    UserDidTakeScreenshot,
}

impl Action for LongLivingAction {}

pub struct LongLivingEffects {
    screenshots: ScreenshotSource,
}

impl LongLivingEffects {
    pub fn new(screenshots: ScreenshotSource) -> Self {
        Self { screenshots }
    }
}

impl Reducer for LongLivingEffects {
    type State = LongLivingState;
    type Action = LongLivingAction;

    fn reduce(
        &self,
        state: &mut LongLivingState,
        action: LongLivingAction,
    ) -> Effect<LongLivingAction> {
        match action {
            LongLivingAction::Task => {
                let mut screenshots = self.screenshots.subscribe();
                Effect::run(move |emitter| async move {
                    loop {
                        match screenshots.recv().await {
                            Ok(()) => {
                                if !emitter.emit(LongLivingAction::UserDidTakeScreenshot) {
                                    break;
                                }
                            }
                            Err(broadcast::error::RecvError::Lagged(missed)) => {
                                debug!(missed, "Screenshot subscriber lagged");
                                for _ in 0..missed {
                                    emitter.emit(LongLivingAction::UserDidTakeScreenshot);
                                }
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                    Ok(())
                })
                .cancellable("screenshots")
            }
            LongLivingAction::UserDidTakeScreenshot => {
                state.screenshot_count += 1;
                Effect::none()
            }
        }
    }
}

/// Screen that ignores screenshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailState {
    pub title: String,
}

impl State for DetailState {}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Screen {
    Counter(LongLivingState),
    Detail(DetailState),
}

impl State for Screen {}

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenAction {
    Counter(LongLivingAction),
}

impl Action for ScreenAction {}

pub struct ScreenReducer {
    counter: LongLivingEffects,
}

impl Reducer for ScreenReducer {
    type State = Screen;
    type Action = ScreenAction;

    fn reduce(&self, state: &mut Screen, action: ScreenAction) -> Effect<ScreenAction> {
        match (state, action) {
            (Screen::Counter(counter), ScreenAction::Counter(action)) => {
                self.counter.reduce(counter, action).map(ScreenAction::Counter)
            }
            (Screen::Detail(_), ScreenAction::Counter(_)) => Effect::none(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LongLivingApp {
    pub path: StackState<Screen>,
}

impl State for LongLivingApp {}

#[derive(Debug, Clone, PartialEq)]
pub enum LongLivingAppAction {
    Path(StackAction<Screen, ScreenAction>),
    OpenCounter,
    OpenDetail,
}

impl Action for LongLivingAppAction {}

struct LongLivingAppReducer {
    ids: Arc<dyn IdGenerator>,
}

impl Reducer for LongLivingAppReducer {
    type State = LongLivingApp;
    type Action = LongLivingAppAction;

    fn reduce(
        &self,
        state: &mut LongLivingApp,
        action: LongLivingAppAction,
    ) -> Effect<LongLivingAppAction> {
        match action {
            LongLivingAppAction::OpenCounter => {
                let Some(id) = state
                    .path
                    .push(&*self.ids, Screen::Counter(LongLivingState::default()))
                else {
                    return Effect::none();
                };
                Effect::send(LongLivingAppAction::Path(StackAction::element(
                    id,
                    ScreenAction::Counter(LongLivingAction::Task),
                )))
            }
            LongLivingAppAction::OpenDetail => {
                state.path.push(
                    &*self.ids,
                    Screen::Detail(DetailState {
                        title: "Another screen".to_string(),
                    }),
                );
                Effect::none()
            }
            LongLivingAppAction::Path(_) => Effect::none(),
        }
    }
}

/// Root reducer of the long-living case study.
pub fn long_living_app(
    screenshots: ScreenshotSource,
    ids: Arc<dyn IdGenerator>,
) -> impl Reducer<State = LongLivingApp, Action = LongLivingAppAction> {
    LongLivingAppReducer { ids }.for_each(
        |app: &mut LongLivingApp| &mut app.path,
        case!(LongLivingAppAction::Path),
        ScreenReducer {
            counter: LongLivingEffects::new(screenshots),
        },
    )
}

impl LongLivingApp {
    /// Screenshot count of the counter frame `id`, if it is on the path.
    pub fn screenshot_count(&self, id: ElementId) -> Option<u32> {
        match self.path.get(id)? {
            Screen::Counter(counter) => Some(counter.screenshot_count),
            Screen::Detail(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identified::IncrementingIds;

    #[test]
    fn screenshot_notification_counts() {
        let reducer = LongLivingEffects::new(ScreenshotSource::new());
        let mut state = LongLivingState::default();
        let effect = reducer.reduce(&mut state, LongLivingAction::UserDidTakeScreenshot);
        assert!(effect.is_none());
        assert_eq!(state.screenshot_count, 1);
    }

    #[test]
    fn open_counter_starts_task_for_new_frame() {
        let reducer = long_living_app(ScreenshotSource::new(), Arc::new(IncrementingIds::new()));
        let mut app = LongLivingApp::default();

        let effect = reducer.reduce(&mut app, LongLivingAppAction::OpenCounter);

        let id = ElementId::from(0);
        assert_eq!(app.screenshot_count(id), Some(0));
        let actions: Vec<_> = effect.immediate_actions().cloned().collect();
        assert_eq!(
            actions,
            vec![LongLivingAppAction::Path(StackAction::element(
                id,
                ScreenAction::Counter(LongLivingAction::Task)
            ))]
        );
    }

    #[test]
    fn detail_frame_ignores_counter_actions() {
        let reducer = long_living_app(ScreenshotSource::new(), Arc::new(IncrementingIds::new()));
        let mut app = LongLivingApp::default();
        let _ = reducer.reduce(&mut app, LongLivingAppAction::OpenDetail);
        let before = app.clone();

        let _ = reducer.reduce(
            &mut app,
            LongLivingAppAction::Path(StackAction::element(
                ElementId::from(0),
                ScreenAction::Counter(LongLivingAction::UserDidTakeScreenshot),
            )),
        );

        assert_eq!(app, before);
    }
}
