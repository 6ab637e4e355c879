//! Stack navigation with a presented sheet.
//!
//! The root owns a path of screens and an optional detail sheet. Counter
//! screens can run a ticking timer that stops when the screen is popped; the
//! sheet can load a summary that is abandoned when the sheet is dismissed.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::case;
use crate::effect::Effect;
use crate::identified::{ElementId, IdGenerator};
use crate::mvi::{reducer_fn, Action, Reducer, State};
use crate::navigation::{PresentationAction, PresentationState, StackAction, StackState};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CounterScreen {
    pub count: i64,
    pub timer_running: bool,
}

impl State for CounterScreen {}

#[derive(Debug, Clone, PartialEq)]
pub enum CounterAction {
    Increment,
    Decrement,
    StartTimer,
    StopTimer,
    TimerTicked,
}

impl Action for CounterAction {}

/// Counter with an optional ticking timer.
pub struct CounterReducer {
    tick: Duration,
}

impl CounterReducer {
    pub fn new(tick: Duration) -> Self {
        Self { tick }
    }
}

impl Reducer for CounterReducer {
    type State = CounterScreen;
    type Action = CounterAction;

    fn reduce(&self, state: &mut CounterScreen, action: CounterAction) -> Effect<CounterAction> {
        match action {
            CounterAction::Increment | CounterAction::TimerTicked => {
                state.count += 1;
                Effect::none()
            }
            CounterAction::Decrement => {
                state.count -= 1;
                Effect::none()
            }
            CounterAction::StartTimer => {
                state.timer_running = true;
                let tick = self.tick;
                Effect::run(move |emitter| async move {
                    let mut interval = tokio::time::interval(tick);
                    // The first tick of an interval completes immediately.
                    interval.tick().await;
                    loop {
                        interval.tick().await;
                        if !emitter.emit(CounterAction::TimerTicked) {
                            return Ok(());
                        }
                    }
                })
                .cancellable("timer")
            }
            CounterAction::StopTimer => {
                state.timer_running = false;
                Effect::cancel("timer")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SettingsScreen {
    pub dark_mode: bool,
}

impl State for SettingsScreen {}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsAction {
    ToggleDarkMode,
}

impl Action for SettingsAction {}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Screen {
    Counter(CounterScreen),
    Settings(SettingsScreen),
}

impl State for Screen {}

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenAction {
    Counter(CounterAction),
    Settings(SettingsAction),
}

impl Action for ScreenAction {}

struct ScreenReducer {
    counter: CounterReducer,
}

impl Reducer for ScreenReducer {
    type State = Screen;
    type Action = ScreenAction;

    fn reduce(&self, state: &mut Screen, action: ScreenAction) -> Effect<ScreenAction> {
        match (state, action) {
            (Screen::Counter(counter), ScreenAction::Counter(action)) => {
                self.counter.reduce(counter, action).map(ScreenAction::Counter)
            }
            (
                Screen::Settings(settings),
                ScreenAction::Settings(SettingsAction::ToggleDarkMode),
            ) => {
                settings.dark_mode = !settings.dark_mode;
                Effect::none()
            }
            // Action for a different kind of screen than the one at this id.
            _ => Effect::none(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailSheet {
    pub title: String,
    pub summary: Option<String>,
    pub loading: bool,
}

impl State for DetailSheet {}

#[derive(Debug, Clone, PartialEq)]
pub enum SheetAction {
    LoadSummary,
    SummaryLoaded(String),
    /// Asks the parent to dismiss the sheet.
    Close,
}

impl Action for SheetAction {}

fn sheet_reducer(latency: Duration) -> impl Reducer<State = DetailSheet, Action = SheetAction> {
    reducer_fn(move |sheet: &mut DetailSheet, action: SheetAction| match action {
        SheetAction::LoadSummary => {
            sheet.loading = true;
            let title = sheet.title.clone();
            Effect::future(async move {
                tokio::time::sleep(latency).await;
                SheetAction::SummaryLoaded(format!("Summary of {}", title))
            })
        }
        SheetAction::SummaryLoaded(summary) => {
            sheet.loading = false;
            sheet.summary = Some(summary);
            Effect::none()
        }
        SheetAction::Close => Effect::none(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NavigationApp {
    pub path: StackState<Screen>,
    pub sheet: PresentationState<DetailSheet>,
}

impl State for NavigationApp {}

#[derive(Debug, Clone, PartialEq)]
pub enum NavigationAction {
    Path(StackAction<Screen, ScreenAction>),
    Sheet(PresentationAction<SheetAction>),
    PushCounter,
    PushSettings,
    PopToRoot,
    ShowDetail(String),
}

impl Action for NavigationAction {}

struct NavigationRoot {
    ids: Arc<dyn IdGenerator>,
}

impl Reducer for NavigationRoot {
    type State = NavigationApp;
    type Action = NavigationAction;

    fn reduce(
        &self,
        app: &mut NavigationApp,
        action: NavigationAction,
    ) -> Effect<NavigationAction> {
        match action {
            NavigationAction::PushCounter => {
                app.path.push(&*self.ids, Screen::Counter(CounterScreen::default()));
                Effect::none()
            }
            NavigationAction::PushSettings => {
                app.path.push(&*self.ids, Screen::Settings(SettingsScreen::default()));
                Effect::none()
            }
            NavigationAction::PopToRoot => {
                app.path.set_path(StackState::new());
                Effect::none()
            }
            NavigationAction::ShowDetail(title) => {
                app.sheet.present(
                    &*self.ids,
                    DetailSheet {
                        title,
                        ..DetailSheet::default()
                    },
                );
                Effect::none()
            }
            NavigationAction::Sheet(PresentationAction::Presented(SheetAction::Close)) => {
                Effect::send(NavigationAction::Sheet(PresentationAction::Dismiss))
            }
            NavigationAction::Path(_) | NavigationAction::Sheet(_) => Effect::none(),
        }
    }
}

/// Timing knobs of the navigation case study.
#[derive(Debug, Clone, Copy)]
pub struct NavigationTimings {
    pub timer_tick: Duration,
    pub summary_latency: Duration,
}

impl Default for NavigationTimings {
    fn default() -> Self {
        Self {
            timer_tick: Duration::from_secs(1),
            summary_latency: Duration::from_millis(500),
        }
    }
}

/// Root reducer of the navigation case study.
pub fn navigation_app(
    ids: Arc<dyn IdGenerator>,
    timings: NavigationTimings,
) -> impl Reducer<State = NavigationApp, Action = NavigationAction> {
    NavigationRoot { ids }
        .for_each(
            |app: &mut NavigationApp| &mut app.path,
            case!(NavigationAction::Path),
            ScreenReducer {
                counter: CounterReducer::new(timings.timer_tick),
            },
        )
        .if_let(
            |app: &mut NavigationApp| &mut app.sheet,
            case!(NavigationAction::Sheet),
            sheet_reducer(timings.summary_latency),
        )
}

impl NavigationApp {
    pub fn counter(&self, id: ElementId) -> Option<&CounterScreen> {
        match self.path.get(id)? {
            Screen::Counter(counter) => Some(counter),
            Screen::Settings(_) => None,
        }
    }
}
