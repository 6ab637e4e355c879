//! Runtime configuration: TOML file, defaults and a reloadable holder.

mod loader;
mod store;
mod types;

pub use loader::ConfigError;
pub use store::ConfigStore;
pub use types::{IdConfig, IdGeneratorKind, LoggingConfig, RuntimeConfig, StoreConfig};
