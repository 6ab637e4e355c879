//! Base trait for store state.

/// Marker trait for state owned by a store.
///
/// States should be:
/// - Values (Clone to take snapshots for observers)
/// - Comparable (PartialEq so watchers can skip unchanged values)
/// - Shareable across the runtime and effect tasks
pub trait State: Clone + PartialEq + Send + Sync + 'static {}
