//! Identity-indexed storage for dynamically created state.

mod collection;
mod ids;

pub use collection::{CollectionError, IdentifiedCollection, IdentifiedElement};
pub use ids::{ElementId, IdGenerator, IncrementingIds, UuidIds};
