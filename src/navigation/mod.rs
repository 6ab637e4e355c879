//! Navigation state built on identified storage.
//!
//! - [`StackState`] / [`StackAction`]: many frames, routed by identity
//! - [`PresentationState`] / [`PresentationAction`]: zero or one presented value
//!
//! Both keep effect lifetimes tied to the subtree that started them.

mod for_each;
mod if_let;
mod presentation;
mod stack;

pub use for_each::ForEachStack;
pub use if_let::IfLetPresented;
pub use presentation::{PresentationAction, PresentationState};
pub use stack::{StackAction, StackState};
