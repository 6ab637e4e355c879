//! Order-preserving collection indexed by stable identity.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::ElementId;

/// Errors raised when building a collection from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    #[error("Duplicate element id {id}")]
    DuplicateId { id: ElementId },
}

/// An element paired with its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifiedElement<T> {
    pub id: ElementId,
    pub value: T,
}

/// Ordered sequence of values, each carrying a stable [`ElementId`].
///
/// Insertion order is the render/navigation order. Lookup, position and
/// removal by id go through the hash index and never scan the order. The
/// collection never invents ids: callers (or an injected
/// [`IdGenerator`](super::IdGenerator)) own identity assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    into = "Vec<IdentifiedElement<T>>",
    try_from = "Vec<IdentifiedElement<T>>",
    bound(serialize = "T: Clone + Serialize", deserialize = "T: Deserialize<'de>")
)]
pub struct IdentifiedCollection<T> {
    elements: IndexMap<ElementId, T>,
}

impl<T> IdentifiedCollection<T> {
    pub fn new() -> Self {
        Self {
            elements: IndexMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    /// Appends `value` under `id`.
    ///
    /// If `id` is already present the existing value is replaced in place and
    /// returned; its position does not change.
    pub fn insert(&mut self, id: ElementId, value: T) -> Option<T> {
        self.elements.insert(id, value)
    }

    /// Removes `id`, shifting later elements down to keep their order.
    pub fn remove(&mut self, id: ElementId) -> Option<T> {
        self.elements.shift_remove(&id)
    }

    pub fn get(&self, id: ElementId) -> Option<&T> {
        self.elements.get(&id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut T> {
        self.elements.get_mut(&id)
    }

    /// Positional access by current order.
    pub fn index(&self, position: usize) -> Option<(ElementId, &T)> {
        self.elements
            .get_index(position)
            .map(|(id, value)| (*id, value))
    }

    pub fn position(&self, id: ElementId) -> Option<usize> {
        self.elements.get_index_of(&id)
    }

    pub fn first(&self) -> Option<(ElementId, &T)> {
        self.elements.first().map(|(id, value)| (*id, value))
    }

    pub fn last(&self) -> Option<(ElementId, &T)> {
        self.elements.last().map(|(id, value)| (*id, value))
    }

    /// Ids in order.
    pub fn ids(&self) -> Vec<ElementId> {
        self.elements.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &T)> + '_ {
        self.elements.iter().map(|(id, value)| (*id, value))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.elements.values()
    }

    /// Drops every element after `len`, returning the removed entries in order.
    pub fn truncate(&mut self, len: usize) -> Vec<IdentifiedElement<T>> {
        if len >= self.elements.len() {
            return Vec::new();
        }
        self.elements
            .drain(len..)
            .map(|(id, value)| IdentifiedElement { id, value })
            .collect()
    }

    pub fn pop_last(&mut self) -> Option<IdentifiedElement<T>> {
        self.elements
            .pop()
            .map(|(id, value)| IdentifiedElement { id, value })
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }
}

impl<T> Default for IdentifiedCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Equal when both hold the same ids, in the same order, with equal values.
impl<T: PartialEq> PartialEq for IdentifiedCollection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.elements.len() == other.elements.len()
            && self.elements.iter().eq(other.elements.iter())
    }
}

impl<T: Eq> Eq for IdentifiedCollection<T> {}

impl<T> FromIterator<(ElementId, T)> for IdentifiedCollection<T> {
    fn from_iter<I: IntoIterator<Item = (ElementId, T)>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl<T> TryFrom<Vec<IdentifiedElement<T>>> for IdentifiedCollection<T> {
    type Error = CollectionError;

    fn try_from(elements: Vec<IdentifiedElement<T>>) -> Result<Self, Self::Error> {
        let mut collection = Self::new();
        for element in elements {
            if collection.contains(element.id) {
                return Err(CollectionError::DuplicateId { id: element.id });
            }
            collection.insert(element.id, element.value);
        }
        Ok(collection)
    }
}

impl<T> From<IdentifiedCollection<T>> for Vec<IdentifiedElement<T>> {
    fn from(collection: IdentifiedCollection<T>) -> Self {
        collection
            .elements
            .into_iter()
            .map(|(id, value)| IdentifiedElement { id, value })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> IdentifiedCollection<&'static str> {
        [
            (ElementId::from(10), "a"),
            (ElementId::from(11), "b"),
            (ElementId::from(12), "c"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn removing_middle_keeps_neighbours() {
        let mut items = abc();
        assert_eq!(items.remove(ElementId::from(11)), Some("b"));

        let remaining: Vec<_> = items.iter().collect();
        assert_eq!(
            remaining,
            vec![(ElementId::from(10), &"a"), (ElementId::from(12), &"c")]
        );
    }

    #[test]
    fn insert_existing_id_replaces_in_place() {
        let mut items = abc();
        assert_eq!(items.insert(ElementId::from(10), "z"), Some("a"));
        assert_eq!(items.index(0), Some((ElementId::from(10), &"z")));
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn truncate_returns_removed_in_order() {
        let mut items = abc();
        let removed = items.truncate(1);
        let ids: Vec<_> = removed.iter().map(|element| element.id).collect();
        assert_eq!(ids, vec![ElementId::from(11), ElementId::from(12)]);
        assert_eq!(items.ids(), &[ElementId::from(10)]);
    }

    #[test]
    fn remove_missing_is_none() {
        let mut items = abc();
        assert_eq!(items.remove(ElementId::from(99)), None);
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn serde_round_trip_preserves_order() {
        let items = abc();
        let json = serde_json::to_string(&items).expect("serialize");
        let decoded: IdentifiedCollection<String> = serde_json::from_str(&json).expect("decode");
        assert_eq!(decoded.ids(), items.ids());
    }

    #[test]
    fn deserialize_rejects_duplicate_ids() {
        let json = r#"[{"id":1,"value":"a"},{"id":1,"value":"b"}]"#;
        let result: Result<IdentifiedCollection<String>, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
