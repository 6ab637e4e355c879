//! Cancellation identities and ownership paths.

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;

use crate::identified::ElementId;

/// Caller-chosen cancellation identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EffectId(Cow<'static, str>);

impl EffectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for EffectId {
    fn from(value: &'static str) -> Self {
        Self(Cow::Borrowed(value))
    }
}

impl From<String> for EffectId {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One level of ownership: a stack frame or a presentation instance.
///
/// The slot names the collection the element lives in, so frames of two
/// sibling stacks with the same element type and id stay distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeSegment {
    kind: TypeId,
    name: &'static str,
    slot: &'static str,
    id: ElementId,
}

impl ScopeSegment {
    /// Segment for the element of type `T` identified by `id`.
    pub fn of<T: 'static>(id: ElementId) -> Self {
        Self::in_slot::<T>("", id)
    }

    /// Segment for the element `id` of type `T` held in the collection `slot`.
    pub fn in_slot<T: 'static>(slot: &'static str, id: ElementId) -> Self {
        Self {
            kind: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            slot,
            id,
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn slot(&self) -> &'static str {
        self.slot
    }

    fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl fmt::Display for ScopeSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.short_name(), self.id)?;
        if !self.slot.is_empty() {
            let slot = self.slot.rsplit("::").next().unwrap_or(self.slot).trim();
            write!(f, "@{}", slot)?;
        }
        Ok(())
    }
}

/// Path from the root state down to the subtree that owns an effect.
///
/// The empty path is the root. Removing a subtree cancels every effect whose
/// path starts with that subtree's path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct OwnerPath(Vec<ScopeSegment>);

impl OwnerPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[ScopeSegment] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &OwnerPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Nests this path under `segment`.
    pub(crate) fn prepend(&mut self, segment: ScopeSegment) {
        self.0.insert(0, segment);
    }
}

impl From<ScopeSegment> for OwnerPath {
    fn from(segment: ScopeSegment) -> Self {
        Self(vec![segment])
    }
}

impl fmt::Display for OwnerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("root");
        }
        for (index, segment) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// Fully qualified cancellation key: an [`EffectId`] inside an owner.
///
/// Two stack frames may use the same `EffectId` without interfering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CancelKey {
    pub owner: OwnerPath,
    pub id: EffectId,
}

impl fmt::Display for CancelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.owner, self.id)
    }
}
