mod common;

use common::temp_config;
use statecraft::config::{ConfigError, ConfigStore, IdGeneratorKind, RuntimeConfig};
use statecraft::identified::ElementId;

/// Test that RuntimeConfig::default() produces the documented values.
#[test]
fn test_config_default_values() {
    let config = RuntimeConfig::default();

    assert_eq!(config.store.history_capacity, 256);
    assert_eq!(config.store.queue_warn_threshold, 1024);
    assert_eq!(config.ids.generator, IdGeneratorKind::Uuid);
    assert_eq!(config.ids.start, 0);
    assert_eq!(config.logging.filter, "info");
    assert!(config.validate().is_ok());
}

/// Test that RuntimeConfig::config_path() returns a path ending with the expected filename.
#[test]
fn test_config_path_ends_with_expected() {
    let path = RuntimeConfig::config_path();
    assert!(path.ends_with("statecraft/config.toml"));
}

/// Test that missing sections fall back to their defaults.
#[test]
fn test_parse_partial_toml() {
    let toml_content = r#"
[store]
history_capacity = 32

[ids]
generator = "incrementing"
start = 100
"#;

    let (_dir, path) = temp_config(toml_content);
    let config = RuntimeConfig::load_from(&path).expect("Should load valid config");

    assert_eq!(config.store.history_capacity, 32);
    assert_eq!(config.store.queue_warn_threshold, 1024);
    assert_eq!(config.ids.generator, IdGeneratorKind::Incrementing);
    assert_eq!(config.logging.filter, "info");
}

/// Test that the configured id generator is the one built.
#[test]
fn test_incrementing_generator_starts_at_configured_id() {
    let (_dir, path) = temp_config("[ids]\ngenerator = \"incrementing\"\nstart = 7\n");
    let config = RuntimeConfig::load_from(&path).expect("Should load valid config");

    let ids = config.ids.build();
    assert_eq!(ids.next_id(), ElementId::from(7));
    assert_eq!(ids.next_id(), ElementId::from(8));
}

/// Test that invalid TOML produces a parse error naming the file.
#[test]
fn test_parse_invalid_toml() {
    let (_dir, path) = temp_config("this is not valid toml [[[");

    match RuntimeConfig::load_from(&path) {
        Err(ConfigError::ParseError { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("Expected ParseError, got {:?}", other),
    }
}

/// Test that an unknown generator name is rejected at parse time.
#[test]
fn test_parse_unknown_generator() {
    let (_dir, path) = temp_config("[ids]\ngenerator = \"sequential\"\n");

    let result = RuntimeConfig::load_from(&path);
    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

/// Test that a missing file is a read error when loaded explicitly.
#[test]
fn test_load_from_missing_file() {
    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("absent.toml");

    let result = RuntimeConfig::load_from(&path);
    assert!(matches!(result, Err(ConfigError::ReadError { .. })));
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
fn test_validation_fails_zero_history_capacity() {
    let (_dir, path) = temp_config("[store]\nhistory_capacity = 0\n");

    match RuntimeConfig::load_from(&path) {
        Err(ConfigError::ValidationError { message }) => {
            assert!(message.contains("history_capacity"));
        }
        other => panic!("Expected ValidationError, got {:?}", other),
    }
}

#[test]
fn test_validation_fails_zero_queue_threshold() {
    let mut config = RuntimeConfig::default();
    config.store.queue_warn_threshold = 0;

    match config.validate() {
        Err(ConfigError::ValidationError { message }) => {
            assert!(message.contains("queue_warn_threshold"));
        }
        other => panic!("Expected ValidationError, got {:?}", other),
    }
}

#[test]
fn test_validation_fails_bad_log_filter() {
    let mut config = RuntimeConfig::default();
    config.logging.filter = "statecraft=loud".to_string();

    match config.validate() {
        Err(ConfigError::ValidationError { message }) => {
            assert!(message.contains("logging.filter"));
        }
        other => panic!("Expected ValidationError, got {:?}", other),
    }
}

/// Test round-trip serialization/deserialization.
#[test]
fn test_config_roundtrip() {
    let mut original = RuntimeConfig::default();
    original.ids.generator = IdGeneratorKind::Incrementing;
    original.logging.filter = "statecraft=debug".to_string();

    let serialized = toml::to_string(&original).expect("Should serialize");
    let deserialized: RuntimeConfig = toml::from_str(&serialized).expect("Should deserialize");

    assert_eq!(original, deserialized);
}

// ============================================================================
// ConfigStore Tests
// ============================================================================

/// Test that reload picks up a changed file.
#[test]
fn test_config_store_reload() {
    let (_dir, path) = temp_config("[store]\nhistory_capacity = 10\n");
    let initial = RuntimeConfig::load_from(&path).expect("Should load valid config");
    let store = ConfigStore::new(initial, path.clone());
    assert_eq!(store.get().store.history_capacity, 10);

    std::fs::write(&path, "[store]\nhistory_capacity = 20\n").expect("Failed to write config");
    store.reload().expect("Should reload valid config");

    assert_eq!(store.get().store.history_capacity, 20);
    assert_eq!(store.path(), path.as_path());
}

/// Test that a failed reload keeps the previous config.
#[test]
fn test_config_store_reload_keeps_old_config_on_error() {
    let (_dir, path) = temp_config("[store]\nhistory_capacity = 10\n");
    let initial = RuntimeConfig::load_from(&path).expect("Should load valid config");
    let store = ConfigStore::new(initial.clone(), path.clone());

    std::fs::write(&path, "[store]\nhistory_capacity = 0\n").expect("Failed to write config");

    assert!(store.reload().is_err());
    assert_eq!(store.get(), initial);
}
