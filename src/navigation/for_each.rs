use tracing::{debug, error, trace};

use super::stack::{StackAction, StackState};
use crate::effect::{Effect, OwnerPath, ScopeSegment};
use crate::identified::ElementId;
use crate::mvi::{CasePath, Reducer};

/// Parent reducer extended with a navigation stack of `R` elements.
///
/// Built with [`Reducer::for_each`].
pub struct ForEachStack<P: Reducer, R: Reducer, L> {
    parent: P,
    stack: L,
    case: CasePath<P::Action, StackAction<R::State, R::Action>>,
    element: R,
}

impl<P, R, L> ForEachStack<P, R, L>
where
    P: Reducer,
    R: Reducer,
    L: Fn(&mut P::State) -> &mut StackState<R::State> + Send + Sync + 'static,
{
    pub(crate) fn new(
        parent: P,
        stack: L,
        case: CasePath<P::Action, StackAction<R::State, R::Action>>,
        element: R,
    ) -> Self {
        Self {
            parent,
            stack,
            case,
            element,
        }
    }

    fn reduce_element(
        &self,
        state: &mut P::State,
        id: ElementId,
        action: R::Action,
    ) -> Effect<P::Action> {
        let Some(element) = (self.stack)(state).get_mut(id) else {
            // The frame was popped while this action was in flight.
            debug!(element = %id, "Dropping action for element no longer on the stack");
            return Effect::none();
        };

        let case = self.case.clone();
        self.element
            .reduce(element, action)
            .map(move |action| case.embed(StackAction::Element { id, action }))
            .scoped_to(self.segment(id))
    }

    fn segment(&self, id: ElementId) -> ScopeSegment {
        ScopeSegment::in_slot::<R::State>(self.case.label(), id)
    }

    fn apply_structural(
        &self,
        state: &mut P::State,
        action: StackAction<R::State, R::Action>,
    ) {
        let stack = (self.stack)(state);
        match action {
            StackAction::Element { .. } => {}
            StackAction::Push { id, state } => {
                if !stack.push_with_id(id, state) {
                    error!(element = %id, "Pushed an element id that is already on the stack");
                    debug_assert!(false, "duplicate stack element id {}", id);
                }
            }
            StackAction::PopTo { id } => {
                if stack.pop_to(id).is_none() {
                    debug!(element = %id, "PopTo target is not on the stack");
                }
            }
            StackAction::PopFrom { id } => {
                if stack.pop_from(id).is_none() {
                    debug!(element = %id, "PopFrom target is not on the stack");
                }
            }
            StackAction::SetPath(path) => stack.set_path(path),
        }
    }
}

impl<P, R, L> Reducer for ForEachStack<P, R, L>
where
    P: Reducer,
    R: Reducer,
    L: Fn(&mut P::State) -> &mut StackState<R::State> + Send + Sync + 'static,
{
    type State = P::State;
    type Action = P::Action;

    fn reduce(&self, state: &mut P::State, action: P::Action) -> Effect<P::Action> {
        let before: Vec<ElementId> = (self.stack)(state).ids();

        let (element_effects, structural) = match self.case.extract(&action).cloned() {
            Some(StackAction::Element { id, action }) => {
                (self.reduce_element(state, id, action), None)
            }
            other => (Effect::none(), other),
        };

        let parent_effects = self.parent.reduce(state, action);

        if let Some(structural) = structural {
            self.apply_structural(state, structural);
        }

        let stack = (self.stack)(state);
        let cancellations: Vec<Effect<P::Action>> = before
            .into_iter()
            .filter(|id| !stack.contains(*id))
            .map(|id| {
                trace!(element = %id, "Stack element removed, cancelling its effects");
                Effect::cancel_owner(OwnerPath::from(self.segment(id)))
            })
            .collect();

        // Cancellations go last so they also catch work the removed frame
        // started during this same reduction.
        element_effects
            .merge_with(parent_effects)
            .merge_with(Effect::merge(cancellations))
    }
}
