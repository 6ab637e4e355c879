//! Unidirectional data flow primitives.
//!
//! # Architecture
//!
//! ```text
//! Action ──→ Reducer ──→ State ──→ Observers
//!    ↑          │
//!    │        Effect
//!    └──────────┘
//! ```
//!
//! - **State**: value owned by a store, observed by snapshot
//! - **Action**: user intents, system events and child actions
//! - **Reducer**: mutates state for an action and describes follow-up work

mod action;
mod reducer;
mod state;

pub use action::{Action, CasePath};
pub use reducer::{reducer_fn, Combine, FnReducer, Reducer, Scope};
pub use state::State;
