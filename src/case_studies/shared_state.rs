//! Two tabs sharing one piece of state.
//!
//! The counter tab and the profile tab both operate on the same [`Stats`]:
//! the profile's reducer is scoped onto the counter's stats, so a reset on
//! the profile is immediately visible on the counter and the other way
//! around. The counter can also present a "is this prime?" alert.

use std::sync::Arc;

use serde::Serialize;

use crate::case;
use crate::effect::Effect;
use crate::identified::IdGenerator;
use crate::mvi::{reducer_fn, Action, Reducer, Scope, State};
use crate::navigation::{PresentationAction, PresentationState};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Tab {
    #[default]
    Counter,
    Profile,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats {
    pub count: i64,
    pub max_count: i64,
    pub min_count: i64,
    pub number_of_counts: u32,
}

impl State for Stats {}

impl Stats {
    pub fn increment(&mut self) {
        self.count += 1;
        self.number_of_counts += 1;
        self.max_count = self.max_count.max(self.count);
    }

    pub fn decrement(&mut self) {
        self.count -= 1;
        self.number_of_counts += 1;
        self.min_count = self.min_count.min(self.count);
    }

    pub fn reset(&mut self) {
        *self = Stats::default();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrimeAlert {
    pub message: String,
}

impl State for PrimeAlert {}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertAction {
    Ok,
}

impl Action for AlertAction {}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CounterTab {
    pub stats: Stats,
    pub alert: PresentationState<PrimeAlert>,
}

impl State for CounterTab {}

#[derive(Debug, Clone, PartialEq)]
pub enum CounterTabAction {
    Increment,
    Decrement,
    IsPrimeTapped,
    Alert(PresentationAction<AlertAction>),
}

impl Action for CounterTabAction {}

struct CounterTabReducer {
    ids: Arc<dyn IdGenerator>,
}

impl Reducer for CounterTabReducer {
    type State = CounterTab;
    type Action = CounterTabAction;

    fn reduce(&self, tab: &mut CounterTab, action: CounterTabAction) -> Effect<CounterTabAction> {
        match action {
            CounterTabAction::Increment => {
                tab.stats.increment();
                Effect::none()
            }
            CounterTabAction::Decrement => {
                tab.stats.decrement();
                Effect::none()
            }
            CounterTabAction::IsPrimeTapped => {
                let count = tab.stats.count;
                let message = if is_prime(count) {
                    format!("👍 The number {} is prime!", count)
                } else {
                    format!("👎 The number {} is not prime :(", count)
                };
                tab.alert.present(&*self.ids, PrimeAlert { message });
                Effect::none()
            }
            CounterTabAction::Alert(PresentationAction::Presented(AlertAction::Ok)) => {
                Effect::send(CounterTabAction::Alert(PresentationAction::Dismiss))
            }
            CounterTabAction::Alert(PresentationAction::Dismiss) => Effect::none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileAction {
    ResetStats,
}

impl Action for ProfileAction {}

fn profile_reducer() -> impl Reducer<State = Stats, Action = ProfileAction> {
    reducer_fn(|stats: &mut Stats, action: ProfileAction| match action {
        ProfileAction::ResetStats => {
            stats.reset();
            Effect::none()
        }
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SharedState {
    pub current_tab: Tab,
    pub counter: CounterTab,
}

impl State for SharedState {}

impl SharedState {
    /// What the profile tab shows: the counter's stats.
    pub fn profile(&self) -> &Stats {
        &self.counter.stats
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SharedAction {
    SelectTab(Tab),
    Counter(CounterTabAction),
    Profile(ProfileAction),
}

impl Action for SharedAction {}

/// Root reducer of the shared-state case study.
pub fn shared_state_app(
    ids: Arc<dyn IdGenerator>,
) -> impl Reducer<State = SharedState, Action = SharedAction> {
    let counter = CounterTabReducer { ids }.if_let(
        |tab: &mut CounterTab| &mut tab.alert,
        case!(CounterTabAction::Alert),
        reducer_fn(|_: &mut PrimeAlert, _: AlertAction| Effect::none()),
    );

    Scope::new(
        |state: &mut SharedState| &mut state.counter,
        case!(SharedAction::Counter),
        counter,
    )
    .combine(Scope::new(
        |state: &mut SharedState| &mut state.counter.stats,
        case!(SharedAction::Profile),
        profile_reducer(),
    ))
    .combine(reducer_fn(|state: &mut SharedState, action: SharedAction| {
        if let SharedAction::SelectTab(tab) = action {
            state.current_tab = tab;
        }
        Effect::none()
    }))
}

pub fn is_prime(n: i64) -> bool {
    if n <= 1 {
        return false;
    }
    if n <= 3 {
        return true;
    }
    let mut divisor = 2;
    while divisor <= n / divisor {
        if n % divisor == 0 {
            return false;
        }
        divisor += 1;
    }
    true
}
