//! Reducer trait and its composition operators.

use std::marker::PhantomData;

use super::action::{Action, CasePath};
use super::state::State;
use crate::effect::Effect;
use crate::navigation::{
    ForEachStack, IfLetPresented, PresentationAction, PresentationState, StackAction, StackState,
};

/// Reducer transforms state based on actions.
///
/// The reducer is the only place where state transitions happen. It mutates
/// the state in place and describes impure follow-up work as an [`Effect`];
/// it never blocks and never performs that work itself.
pub trait Reducer: Send + Sync + 'static {
    /// The state type this reducer operates on.
    type State: State;

    /// The action type this reducer handles.
    type Action: Action;

    /// Process an action and return the effects to run.
    fn reduce(&self, state: &mut Self::State, action: Self::Action) -> Effect<Self::Action>;

    /// Runs `self`, then `next`, on every action.
    fn combine<R>(self, next: R) -> Combine<Self, R>
    where
        Self: Sized,
        R: Reducer<State = Self::State, Action = Self::Action>,
    {
        Combine { first: self, second: next }
    }

    /// Routes `StackAction::Element` actions to `element`, applies structural
    /// stack actions, and cancels the effects of every frame that disappears.
    ///
    /// The element reducer runs before `self`.
    fn for_each<R, L>(
        self,
        stack: L,
        case: CasePath<Self::Action, StackAction<R::State, R::Action>>,
        element: R,
    ) -> ForEachStack<Self, R, L>
    where
        Self: Sized,
        R: Reducer,
        L: Fn(&mut Self::State) -> &mut StackState<R::State> + Send + Sync + 'static,
    {
        ForEachStack::new(self, stack, case, element)
    }

    /// Routes `PresentationAction::Presented` to `child` while something is
    /// presented, clears the slot on `Dismiss`, and cancels the effects of
    /// every presentation instance that goes away.
    ///
    /// The child reducer runs before `self`.
    fn if_let<R, L>(
        self,
        slot: L,
        case: CasePath<Self::Action, PresentationAction<R::Action>>,
        child: R,
    ) -> IfLetPresented<Self, R, L>
    where
        Self: Sized,
        R: Reducer,
        L: Fn(&mut Self::State) -> &mut PresentationState<R::State> + Send + Sync + 'static,
    {
        IfLetPresented::new(self, slot, case, child)
    }
}

/// Reducer backed by a closure.
pub struct FnReducer<S, A, F> {
    reduce: F,
    _marker: PhantomData<fn(&mut S, A)>,
}

/// Wraps a closure as a [`Reducer`].
pub fn reducer_fn<S, A, F>(reduce: F) -> FnReducer<S, A, F>
where
    S: State,
    A: Action,
    F: Fn(&mut S, A) -> Effect<A> + Send + Sync + 'static,
{
    FnReducer {
        reduce,
        _marker: PhantomData,
    }
}

impl<S, A, F> Reducer for FnReducer<S, A, F>
where
    S: State,
    A: Action,
    F: Fn(&mut S, A) -> Effect<A> + Send + Sync + 'static,
{
    type State = S;
    type Action = A;

    fn reduce(&self, state: &mut S, action: A) -> Effect<A> {
        (self.reduce)(state, action)
    }
}

/// Two reducers over the same domain, run in sequence.
pub struct Combine<R1, R2> {
    first: R1,
    second: R2,
}

impl<R1, R2> Reducer for Combine<R1, R2>
where
    R1: Reducer,
    R2: Reducer<State = R1::State, Action = R1::Action>,
{
    type State = R1::State;
    type Action = R1::Action;

    fn reduce(&self, state: &mut Self::State, action: Self::Action) -> Effect<Self::Action> {
        let first = self.first.reduce(state, action.clone());
        let second = self.second.reduce(state, action);
        first.merge_with(second)
    }
}

/// Embeds a child reducer into a parent domain.
///
/// Parent actions matching `case` are handed to the child together with the
/// substate selected by `lens`; the child's effects are mapped back into the
/// parent action type. Other actions are ignored.
pub struct Scope<P, PA, R: Reducer, L> {
    lens: L,
    case: CasePath<PA, R::Action>,
    child: R,
    _marker: PhantomData<fn(&mut P)>,
}

impl<P, PA, R, L> Scope<P, PA, R, L>
where
    P: State,
    PA: Action,
    R: Reducer,
    L: Fn(&mut P) -> &mut R::State + Send + Sync + 'static,
{
    pub fn new(lens: L, case: CasePath<PA, R::Action>, child: R) -> Self {
        Self {
            lens,
            case,
            child,
            _marker: PhantomData,
        }
    }
}

impl<P, PA, R, L> Reducer for Scope<P, PA, R, L>
where
    P: State,
    PA: Action,
    R: Reducer,
    L: Fn(&mut P) -> &mut R::State + Send + Sync + 'static,
{
    type State = P;
    type Action = PA;

    fn reduce(&self, state: &mut P, action: PA) -> Effect<PA> {
        let Some(child_action) = self.case.extract(&action).cloned() else {
            return Effect::none();
        };
        self.child
            .reduce((self.lens)(state), child_action)
            .map_arc(self.case.embedder())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case;

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Parent {
        child: i32,
        log: Vec<String>,
    }

    impl State for Parent {}

    #[derive(Debug, Clone, PartialEq)]
    enum ParentAction {
        Child(ChildAction),
        Noted,
    }

    impl Action for ParentAction {}

    #[derive(Debug, Clone, PartialEq)]
    enum ChildAction {
        Increment,
    }

    impl Action for ChildAction {}

    impl State for i32 {}

    fn child() -> impl Reducer<State = i32, Action = ChildAction> {
        reducer_fn(|count: &mut i32, action: ChildAction| match action {
            ChildAction::Increment => {
                *count += 1;
                Effect::none()
            }
        })
    }

    #[test]
    fn scope_runs_child_before_parent() {
        let reducer = Scope::new(
            |state: &mut Parent| &mut state.child,
            case!(ParentAction::Child),
            child(),
        )
        .combine(reducer_fn(|state: &mut Parent, action: ParentAction| {
            if let ParentAction::Child(_) = action {
                // Parent logic sees the child's update within the same cycle.
                let seen = format!("child={}", state.child);
                state.log.push(seen);
            }
            Effect::none()
        }));

        let mut state = Parent::default();
        let effect = reducer.reduce(&mut state, ParentAction::Child(ChildAction::Increment));

        assert!(effect.is_none());
        assert_eq!(state.child, 1);
        assert_eq!(state.log, vec!["child=1".to_string()]);
    }

    #[test]
    fn scope_ignores_other_actions() {
        let reducer = Scope::new(
            |state: &mut Parent| &mut state.child,
            case!(ParentAction::Child),
            child(),
        );
        let mut state = Parent::default();
        let _ = reducer.reduce(&mut state, ParentAction::Noted);
        assert_eq!(state, Parent::default());
    }

    #[test]
    fn child_effects_are_embedded() {
        let reducer = Scope::new(
            |state: &mut Parent| &mut state.child,
            case!(ParentAction::Child),
            reducer_fn(|_: &mut i32, _: ChildAction| Effect::send(ChildAction::Increment)),
        );
        let mut state = Parent::default();
        let effect = reducer.reduce(&mut state, ParentAction::Child(ChildAction::Increment));
        let actions: Vec<_> = effect.immediate_actions().cloned().collect();
        assert_eq!(actions, vec![ParentAction::Child(ChildAction::Increment)]);
    }
}
