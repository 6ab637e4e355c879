//! Small applications built on the runtime.
//!
//! - [`long_living`]: a subscription that lives exactly as long as its screen
//! - [`navigation`]: stack navigation plus a presented sheet
//! - [`shared_state`]: two features reducing the same state

pub mod long_living;
pub mod navigation;
pub mod shared_state;
