use tracing::{debug, trace};

use super::presentation::{PresentationAction, PresentationState};
use crate::effect::{Effect, OwnerPath, ScopeSegment};
use crate::identified::ElementId;
use crate::mvi::{CasePath, Reducer};

/// Parent reducer extended with an optional presented child.
///
/// Built with [`Reducer::if_let`].
pub struct IfLetPresented<P: Reducer, R: Reducer, L> {
    parent: P,
    slot: L,
    case: CasePath<P::Action, PresentationAction<R::Action>>,
    child: R,
}

impl<P, R, L> IfLetPresented<P, R, L>
where
    P: Reducer,
    R: Reducer,
    L: Fn(&mut P::State) -> &mut PresentationState<R::State> + Send + Sync + 'static,
{
    pub(crate) fn new(
        parent: P,
        slot: L,
        case: CasePath<P::Action, PresentationAction<R::Action>>,
        child: R,
    ) -> Self {
        Self {
            parent,
            slot,
            case,
            child,
        }
    }

    fn reduce_presented(&self, state: &mut P::State, action: R::Action) -> Effect<P::Action> {
        let Some((id, value)) = (self.slot)(state).instance_mut() else {
            debug!("Dropping presented action: nothing is presented");
            return Effect::none();
        };

        let case = self.case.clone();
        self.child
            .reduce(value, action)
            .map(move |action| case.embed(PresentationAction::Presented(action)))
            .scoped_to(self.segment(id))
    }

    fn segment(&self, id: ElementId) -> ScopeSegment {
        ScopeSegment::in_slot::<R::State>(self.case.label(), id)
    }
}

impl<P, R, L> Reducer for IfLetPresented<P, R, L>
where
    P: Reducer,
    R: Reducer,
    L: Fn(&mut P::State) -> &mut PresentationState<R::State> + Send + Sync + 'static,
{
    type State = P::State;
    type Action = P::Action;

    fn reduce(&self, state: &mut P::State, action: P::Action) -> Effect<P::Action> {
        let before = (self.slot)(state).id();

        let (child_effects, dismiss) = match self.case.extract(&action).cloned() {
            Some(PresentationAction::Presented(child_action)) => {
                (self.reduce_presented(state, child_action), false)
            }
            Some(PresentationAction::Dismiss) => (Effect::none(), true),
            None => (Effect::none(), false),
        };

        let parent_effects = self.parent.reduce(state, action);

        let slot = (self.slot)(state);
        if dismiss && slot.dismiss().is_none() {
            trace!("Dismiss with nothing presented");
        }

        let cancellation = match before {
            Some(old) if slot.id() != Some(old) => {
                trace!(presentation = %old, "Presentation ended, cancelling its effects");
                Effect::cancel_owner(OwnerPath::from(self.segment(old)))
            }
            _ => Effect::none(),
        };

        child_effects
            .merge_with(parent_effects)
            .merge_with(cancellation)
    }
}
