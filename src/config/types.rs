use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::identified::{IdGenerator, IncrementingIds, UuidIds};

/// Root configuration container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub ids: IdConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tuning for root stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Number of recent store events kept by the observability hub (default: 256).
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Queue depth at which a warning is logged (default: 1024).
    #[serde(default = "default_queue_warn_threshold")]
    pub queue_warn_threshold: usize,
}

/// Which identity source new stack frames and presentations use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdGeneratorKind {
    #[default]
    Uuid,
    /// Deterministic ids, for replays and tests.
    Incrementing,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdConfig {
    #[serde(default)]
    pub generator: IdGeneratorKind,
    /// First id handed out by the incrementing generator (default: 0).
    #[serde(default)]
    pub start: u64,
}

impl IdConfig {
    pub fn build(&self) -> Arc<dyn IdGenerator> {
        match self.generator {
            IdGeneratorKind::Uuid => Arc::new(UuidIds),
            IdGeneratorKind::Incrementing => Arc::new(IncrementingIds::starting_at(self.start)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter used when `RUST_LOG` is not set (default: "info").
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_history_capacity() -> usize {
    256
}

fn default_queue_warn_threshold() -> usize {
    1024
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            queue_warn_threshold: default_queue_warn_threshold(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}
