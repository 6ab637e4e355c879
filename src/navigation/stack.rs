//! Navigation stack state and its actions.

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::identified::{ElementId, IdGenerator, IdentifiedCollection, IdentifiedElement};
use crate::mvi::{Action, State};
use crate::store::Store;

/// Ordered path from the root screen to the visible leaf.
///
/// Only the last frame is visible, but every frame keeps live state and live
/// effects until it is popped. Frames are addressed by [`ElementId`], never by
/// position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    transparent,
    bound(serialize = "E: Clone + Serialize", deserialize = "E: Deserialize<'de>")
)]
pub struct StackState<E> {
    frames: IdentifiedCollection<E>,
}

impl<E: State> State for StackState<E> {}

impl<E> StackState<E> {
    pub fn new() -> Self {
        Self {
            frames: IdentifiedCollection::new(),
        }
    }

    /// Pushes `element` with a fresh id from `ids` and returns that id.
    ///
    /// Returns `None` and leaves the stack untouched when the generator hands
    /// out an id that is already on the stack.
    pub fn push(&mut self, ids: &dyn IdGenerator, element: E) -> Option<ElementId> {
        let id = ids.next_id();
        if !self.push_with_id(id, element) {
            error!(element = %id, "Id generator returned an id that is already on the stack");
            return None;
        }
        Some(id)
    }

    /// Pushes under a caller-provided id. Returns `false` and leaves the stack
    /// untouched when `id` is already on the stack.
    pub fn push_with_id(&mut self, id: ElementId, element: E) -> bool {
        if self.frames.contains(id) {
            return false;
        }
        self.frames.insert(id, element);
        true
    }

    pub fn pop_last(&mut self) -> Option<IdentifiedElement<E>> {
        self.frames.pop_last()
    }

    /// Pops every frame above `id`, keeping `id` on top.
    ///
    /// Returns the removed ids, or `None` when `id` is not on the stack.
    pub fn pop_to(&mut self, id: ElementId) -> Option<Vec<ElementId>> {
        let position = self.frames.position(id)?;
        Some(self.removed_ids(position + 1))
    }

    /// Pops `id` and every frame above it.
    ///
    /// Returns the removed ids, or `None` when `id` is not on the stack.
    pub fn pop_from(&mut self, id: ElementId) -> Option<Vec<ElementId>> {
        let position = self.frames.position(id)?;
        Some(self.removed_ids(position))
    }

    /// Replaces the whole path. Frames whose id survives keep their identity.
    pub fn set_path(&mut self, path: StackState<E>) {
        self.frames = path.frames;
    }

    pub fn get(&self, id: ElementId) -> Option<&E> {
        self.frames.get(id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut E> {
        self.frames.get_mut(id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.frames.contains(id)
    }

    pub fn ids(&self) -> Vec<ElementId> {
        self.frames.ids()
    }

    /// The visible frame.
    pub fn last(&self) -> Option<(ElementId, &E)> {
        self.frames.last()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &E)> + '_ {
        self.frames.iter()
    }

    fn removed_ids(&mut self, keep: usize) -> Vec<ElementId> {
        self.frames
            .truncate(keep)
            .into_iter()
            .map(|element| element.id)
            .collect()
    }
}

impl<E> Default for StackState<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> FromIterator<(ElementId, E)> for StackState<E> {
    fn from_iter<I: IntoIterator<Item = (ElementId, E)>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

/// Actions of a navigation stack.
#[derive(Debug, Clone, PartialEq)]
pub enum StackAction<E, A> {
    /// An action for the frame `id`. A no-op once that frame is gone.
    Element { id: ElementId, action: A },
    /// Push `state` as a new frame on top.
    Push { id: ElementId, state: E },
    /// Pop every frame above `id`.
    PopTo { id: ElementId },
    /// Pop `id` and every frame above it.
    PopFrom { id: ElementId },
    /// Replace the whole path.
    SetPath(StackState<E>),
}

impl<E: State, A: Action> Action for StackAction<E, A> {}

impl<E, A> StackAction<E, A> {
    pub fn element(id: ElementId, action: A) -> Self {
        StackAction::Element { id, action }
    }
}

impl<E, EA> Store<StackState<E>, StackAction<E, EA>>
where
    E: State,
    EA: Action,
{
    /// Derives a store for the frame `id`.
    ///
    /// The derived store reads the frame live by identity and wraps sends into
    /// `StackAction::Element`. Once the frame is popped it becomes invalid:
    /// `state()` keeps returning the last value seen and `send` is a no-op.
    /// Returns `None` when `id` is not on the stack.
    pub fn scope_element(&self, id: ElementId) -> Option<Store<E, EA>> {
        self.scope_optional(
            move |stack: &StackState<E>| stack.get(id),
            move |action| StackAction::Element { id, action },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identified::IncrementingIds;

    fn stack_of(count: usize) -> (StackState<String>, IncrementingIds) {
        let ids = IncrementingIds::new();
        let mut stack = StackState::new();
        for index in 0..count {
            stack.push(&ids, format!("screen {}", index));
        }
        (stack, ids)
    }

    #[test]
    fn push_assigns_sequential_ids() {
        let (stack, _) = stack_of(3);
        assert_eq!(
            stack.ids(),
            &[ElementId::from(0), ElementId::from(1), ElementId::from(2)]
        );
        assert_eq!(stack.last().map(|(id, _)| id), Some(ElementId::from(2)));
    }

    #[test]
    fn pop_to_keeps_target_on_top() {
        let (mut stack, _) = stack_of(3);
        let removed = stack.pop_to(ElementId::from(1));
        assert_eq!(removed, Some(vec![ElementId::from(2)]));
        assert_eq!(stack.ids(), &[ElementId::from(0), ElementId::from(1)]);
    }

    #[test]
    fn pop_from_removes_target() {
        let (mut stack, _) = stack_of(3);
        let removed = stack.pop_from(ElementId::from(1));
        assert_eq!(removed, Some(vec![ElementId::from(1), ElementId::from(2)]));
        assert_eq!(stack.ids(), &[ElementId::from(0)]);
    }

    #[test]
    fn pop_to_unknown_id_is_none() {
        let (mut stack, _) = stack_of(2);
        assert_eq!(stack.pop_to(ElementId::from(42)), None);
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn push_with_existing_id_is_rejected() {
        let (mut stack, _) = stack_of(1);
        assert!(!stack.push_with_id(ElementId::from(0), "dup".to_string()));
        assert_eq!(stack.get(ElementId::from(0)).map(String::as_str), Some("screen 0"));
    }

    #[test]
    fn push_with_reused_generated_id_keeps_existing_frame() {
        let (mut stack, _) = stack_of(1);
        let restarted = IncrementingIds::new();

        assert_eq!(stack.push(&restarted, "other".to_string()), None);
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.get(ElementId::from(0)).map(String::as_str), Some("screen 0"));
        assert_eq!(stack.push(&restarted, "next".to_string()), Some(ElementId::from(1)));
    }

    #[test]
    fn ids_survive_copies() {
        let (stack, ids) = stack_of(2);
        let mut copy = stack.clone();
        copy.push(&ids, "screen 2".to_string());
        assert_eq!(&copy.ids()[..2], stack.ids());
    }
}
