//! Loading runtime configuration from disk

use brickgraph::config::{RuntimeConfig, DEFAULT_POOL_CAPACITY};
use brickgraph::error::ErrorCategory;
use brickgraph::Scheduler;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(
        r#"
[scheduler]
max_threads = 1
idle_sleep_us = 5

[queue]
default_capacity = 32

[logging]
filter = "brickgraph=debug"
"#,
    );
    let config = RuntimeConfig::load(file.path()).unwrap();
    assert_eq!(config.scheduler.max_threads, 1);
    assert_eq!(config.scheduler.idle_sleep().as_micros(), 5);
    assert_eq!(config.queue.default_capacity, 32);
    assert_eq!(config.pool.capacity, DEFAULT_POOL_CAPACITY);
    assert_eq!(config.logging.filter, "brickgraph=debug");

    // the limit is honored by the scheduler built from it
    let mut sched = Scheduler::new(config.scheduler);
    let _first = sched.init_manual().unwrap();
    assert!(sched.init_manual().is_err());
}

#[test]
fn test_invalid_file_is_config_error() {
    let file = write_config("[pool]\ncapacity = 0\n");
    let err = RuntimeConfig::load(file.path()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Config);
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = RuntimeConfig::load_or_default(dir.path().join("absent.toml"));
    assert_eq!(config, RuntimeConfig::default());
}

#[test]
fn test_missing_file_keeps_os_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let err = RuntimeConfig::load(&path).unwrap_err();
    assert!(err.errno().is_some());
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn test_saved_config_loads_back() {
    let mut config = RuntimeConfig::default();
    config.scheduler.error_stack_capacity = 3;
    let file = write_config(&config.to_toml_string().unwrap());
    assert_eq!(RuntimeConfig::load(file.path()).unwrap(), config);
}
