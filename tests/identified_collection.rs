//! Property tests for identity-indexed storage.

use proptest::prelude::*;
use statecraft::identified::{ElementId, IdGenerator, IdentifiedCollection, IncrementingIds};
use statecraft::navigation::StackState;

fn collection_of(values: &[i32]) -> IdentifiedCollection<i32> {
    let ids = IncrementingIds::new();
    values
        .iter()
        .map(|value| (ids.next_id(), *value))
        .collect()
}

proptest! {
    /// Removing any element leaves every other id mapped to its own value,
    /// in the original relative order.
    #[test]
    fn removal_keeps_other_identities(
        values in prop::collection::vec(any::<i32>(), 1..24),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut collection = collection_of(&values);
        let removed = pick.index(values.len());
        let removed_id = ElementId::from(removed as u64);

        prop_assert_eq!(collection.remove(removed_id), Some(values[removed]));

        let expected: Vec<(ElementId, i32)> = values
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != removed)
            .map(|(index, value)| (ElementId::from(index as u64), *value))
            .collect();
        let actual: Vec<(ElementId, i32)> =
            collection.iter().map(|(id, value)| (id, *value)).collect();
        prop_assert_eq!(actual, expected);
        prop_assert!(!collection.contains(removed_id));
        prop_assert_eq!(collection.get(removed_id), None);
    }

    /// Truncation splits the collection without losing or reordering anything.
    #[test]
    fn truncate_partitions_elements(
        values in prop::collection::vec(any::<i32>(), 0..24),
        keep in 0usize..30,
    ) {
        let original = collection_of(&values);
        let mut kept = original.clone();
        let removed = kept.truncate(keep);

        prop_assert_eq!(kept.len(), keep.min(values.len()));
        let rejoined: Vec<ElementId> = kept
            .ids()
            .into_iter()
            .chain(removed.iter().map(|element| element.id))
            .collect();
        prop_assert_eq!(rejoined, original.ids());
    }

    /// The same pushes against the same deterministic generator build equal
    /// stacks.
    #[test]
    fn incrementing_ids_make_stacks_reproducible(
        values in prop::collection::vec(any::<i32>(), 0..16),
        start in 0u64..1_000,
    ) {
        let build = || {
            let ids = IncrementingIds::starting_at(start);
            let mut stack = StackState::new();
            for value in &values {
                stack.push(&ids, *value);
            }
            stack
        };

        let first = build();
        let second = build();
        prop_assert_eq!(&first, &second);
        if let Some((id, _)) = first.last() {
            prop_assert_eq!(id, ElementId::from(start + values.len() as u64 - 1));
        }
    }
}

#[test]
fn test_position_follows_removals() {
    let mut collection = collection_of(&[1, 2, 3, 4]);

    collection.remove(ElementId::from(1));

    assert_eq!(collection.position(ElementId::from(2)), Some(1));
    assert_eq!(collection.position(ElementId::from(1)), None);
    assert_eq!(collection.first(), Some((ElementId::from(0), &1)));
}
