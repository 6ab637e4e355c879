//! Optional presented state (sheets, alerts, drill-downs) and its actions.

use serde::{Deserialize, Serialize};

use crate::identified::{ElementId, IdGenerator, IdentifiedElement};
use crate::mvi::{Action, State};
use crate::store::Store;

/// Either nothing, or one presented value with its own instance identity.
///
/// Presenting a value that is equal to a previously dismissed one still
/// yields a new id, so work tied to the old instance can never attach to the
/// new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct PresentationState<T> {
    presented: Option<IdentifiedElement<T>>,
}

impl<T: State> State for PresentationState<T> {}

impl<T> PresentationState<T> {
    pub fn none() -> Self {
        Self { presented: None }
    }

    /// Presents `value` as a new instance, replacing anything presented.
    pub fn present(&mut self, ids: &dyn IdGenerator, value: T) -> ElementId {
        let id = ids.next_id();
        self.presented = Some(IdentifiedElement { id, value });
        id
    }

    pub fn present_with_id(&mut self, id: ElementId, value: T) {
        self.presented = Some(IdentifiedElement { id, value });
    }

    /// Clears the slot and returns what was presented.
    pub fn dismiss(&mut self) -> Option<T> {
        self.presented.take().map(|element| element.value)
    }

    pub fn take(&mut self) -> Option<IdentifiedElement<T>> {
        self.presented.take()
    }

    pub fn is_presented(&self) -> bool {
        self.presented.is_some()
    }

    /// Identity of the current presentation instance.
    pub fn id(&self) -> Option<ElementId> {
        self.presented.as_ref().map(|element| element.id)
    }

    pub fn get(&self) -> Option<&T> {
        self.presented.as_ref().map(|element| &element.value)
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.presented.as_mut().map(|element| &mut element.value)
    }

    /// The presented value, only while instance `id` is the one presented.
    pub fn get_instance(&self, id: ElementId) -> Option<&T> {
        self.presented
            .as_ref()
            .filter(|element| element.id == id)
            .map(|element| &element.value)
    }

    pub(crate) fn instance_mut(&mut self) -> Option<(ElementId, &mut T)> {
        self.presented
            .as_mut()
            .map(|element| (element.id, &mut element.value))
    }
}

impl<T> Default for PresentationState<T> {
    fn default() -> Self {
        Self::none()
    }
}

/// Actions of a presentation slot.
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationAction<A> {
    /// An action for the presented value. A no-op while nothing is presented.
    Presented(A),
    /// Clear the slot, cancelling everything the presented value started.
    Dismiss,
}

impl<A: Action> Action for PresentationAction<A> {}

impl<T, TA> Store<PresentationState<T>, PresentationAction<TA>>
where
    T: State,
    TA: Action,
{
    /// Derives a store bound to the instance presented right now.
    ///
    /// The derived store stays bound to that instance: after a dismiss, or a
    /// new presentation replacing it, it is invalid and its sends are dropped.
    /// Returns `None` when nothing is presented.
    pub fn scope_presented(&self) -> Option<Store<T, TA>> {
        let id = self.try_state()?.id()?;
        self.scope_optional(
            move |slot: &PresentationState<T>| slot.get_instance(id),
            PresentationAction::Presented,
        )
    }
}
