//! Stable element identities and the generators that hand them out.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a dynamically created element (stack frame, presentation).
///
/// Identities travel with copies of the state that holds them, so they are
/// plain values rather than pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(u128);

impl ElementId {
    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }
}

impl From<u64> for ElementId {
    fn from(value: u64) -> Self {
        Self(u128::from(value))
    }
}

impl From<Uuid> for ElementId {
    fn from(value: Uuid) -> Self {
        Self(value.as_u128())
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Small ids come from the incrementing generator, print them as-is.
        if self.0 <= u128::from(u64::MAX) {
            write!(f, "#{}", self.0)
        } else {
            write!(f, "{}", Uuid::from_u128(self.0))
        }
    }
}

/// Source of fresh element identities.
///
/// Production code uses [`UuidIds`]; tests inject [`IncrementingIds`] so that
/// pushed frames get `0, 1, 2, ...`.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> ElementId;
}

/// Globally unique identities backed by random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self) -> ElementId {
        ElementId::from(Uuid::new_v4())
    }
}

/// Deterministic sequential identities.
#[derive(Debug, Default)]
pub struct IncrementingIds {
    next: AtomicU64,
}

impl IncrementingIds {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    /// Id the next call to [`IdGenerator::next_id`] will return.
    pub fn peek(&self) -> ElementId {
        ElementId::from(self.next.load(Ordering::SeqCst))
    }
}

impl IdGenerator for IncrementingIds {
    fn next_id(&self) -> ElementId {
        ElementId::from(self.next.fetch_add(1, Ordering::SeqCst))
    }
}
