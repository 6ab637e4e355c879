//! Composable state management: stores, effects and identity-based scoping.
//!
//! ```text
//! send(action) ──→ queue ──→ reducer(&mut state, action) ──→ Effect
//!      ↑                                                      │
//!      └──────────────── Emitter ←── tokio task ←─────────────┘
//! ```
//!
//! Dynamically created children (stack frames, presented sheets) are
//! addressed by [`identified::ElementId`]. Stores scoped to them go stale when
//! they are removed, and effects they started are cancelled with them.

pub mod case_studies;
pub mod config;
pub mod effect;
pub mod identified;
pub mod logging;
pub mod metrics;
pub mod mvi;
pub mod navigation;
pub mod store;

pub use effect::{Effect, EffectError, EffectId, Emitter};
pub use identified::{ElementId, IdGenerator, IdentifiedCollection};
pub use mvi::{reducer_fn, Action, CasePath, Reducer, Scope, State};
pub use navigation::{PresentationAction, PresentationState, StackAction, StackState};
pub use store::{SendTask, StateWatcher, Store};
