//! Base trait for actions and the case paths that route them.

use std::sync::Arc;

/// Marker trait for action values.
///
/// Actions represent:
/// - User intents (button taps, navigation requests)
/// - System events (timer ticks, notifications, responses)
/// - Child actions wrapped by a parent
///
/// Actions are consumed by reducers and re-enter the store from effects.
pub trait Action: Clone + Send + 'static {}

/// Two-way mapping between a parent action and one of its cases.
///
/// `embed` wraps a child action into the parent type, `extract` looks at a
/// parent action and returns the child payload when it is that case. The
/// label names the case; navigation uses it to keep effects of sibling
/// collections apart. Build one with [`case!`](crate::case) for tuple
/// variants.
pub struct CasePath<P, C> {
    label: &'static str,
    embed: Arc<dyn Fn(C) -> P + Send + Sync>,
    extract: Arc<dyn Fn(&P) -> Option<&C> + Send + Sync>,
}

impl<P, C> CasePath<P, C> {
    pub fn new(
        label: &'static str,
        embed: impl Fn(C) -> P + Send + Sync + 'static,
        extract: impl Fn(&P) -> Option<&C> + Send + Sync + 'static,
    ) -> Self {
        Self {
            label,
            embed: Arc::new(embed),
            extract: Arc::new(extract),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn embed(&self, child: C) -> P {
        (self.embed)(child)
    }

    pub fn extract<'a>(&self, parent: &'a P) -> Option<&'a C> {
        (self.extract)(parent)
    }

    pub fn embedder(&self) -> Arc<dyn Fn(C) -> P + Send + Sync> {
        Arc::clone(&self.embed)
    }
}

impl<P, C> Clone for CasePath<P, C> {
    fn clone(&self) -> Self {
        Self {
            label: self.label,
            embed: Arc::clone(&self.embed),
            extract: Arc::clone(&self.extract),
        }
    }
}

/// Builds a [`CasePath`] for a tuple enum variant.
///
/// ```ignore
/// let path = case!(AppAction::Path);
/// ```
#[macro_export]
macro_rules! case {
    ($variant:path) => {
        $crate::mvi::CasePath::new(
            ::core::stringify!($variant),
            $variant,
            |action| match action {
                $variant(inner) => ::core::option::Option::Some(inner),
                #[allow(unreachable_patterns)]
                _ => ::core::option::Option::None,
            },
        )
    };
}
