//! Runtime configuration
//!
//! All knobs the runtime reads at startup, loadable from a TOML file:
//!
//! ```toml
//! [scheduler]
//! max_threads = 4
//! idle_sleep_us = 50
//!
//! [queue]
//! default_capacity = 32
//!
//! [logging]
//! filter = "brickgraph=debug"
//! ```
//!
//! Every section and field is optional; anything missing keeps its default.

use crate::error::{Error, ErrorKind, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default maximum number of scheduler threads
pub const DEFAULT_MAX_THREADS: usize = 16;

/// Default per-thread command ring capacity
pub const DEFAULT_COMMAND_QUEUE_CAPACITY: usize = 64;

/// Default per-thread error stack depth
pub const DEFAULT_ERROR_STACK_CAPACITY: usize = 16;

/// Default sleep between ticks of a thread with nothing running, in microseconds
pub const DEFAULT_IDLE_SLEEP_US: u64 = 100;

/// Default number of bursts a queue endpoint can hold
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Default number of live packet buffers
pub const DEFAULT_POOL_CAPACITY: usize = 4096;

/// Default packet buffer size in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 2048;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub scheduler: SchedulerConfig,
    pub queue: QueueConfig,
    pub pool: PoolConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Threads `Scheduler::init` may create
    pub max_threads: usize,
    /// Pending commands per thread before `add_graph` and friends fail
    pub command_queue_capacity: usize,
    /// Errors kept per thread; older ones are discarded
    pub error_stack_capacity: usize,
    /// Sleep when a thread has no running graph
    pub idle_sleep_us: u64,
}

impl SchedulerConfig {
    pub fn idle_sleep(&self) -> Duration {
        Duration::from_micros(self.idle_sleep_us)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_threads: DEFAULT_MAX_THREADS,
            command_queue_capacity: DEFAULT_COMMAND_QUEUE_CAPACITY,
            error_stack_capacity: DEFAULT_ERROR_STACK_CAPACITY,
            idle_sleep_us: DEFAULT_IDLE_SLEEP_US,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub default_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub capacity: usize,
    pub buffer_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_POOL_CAPACITY,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::new(ErrorKind::Config(format!("Failed to parse config: {}", e))))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::from(e).with_context(format!("Failed to read config file {:?}", path))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load a config file, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| {
            Error::new(ErrorKind::Config(format!("Failed to serialize config: {}", e)))
        })
    }

    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("scheduler.max_threads", self.scheduler.max_threads),
            (
                "scheduler.command_queue_capacity",
                self.scheduler.command_queue_capacity,
            ),
            (
                "scheduler.error_stack_capacity",
                self.scheduler.error_stack_capacity,
            ),
            ("queue.default_capacity", self.queue.default_capacity),
            ("pool.capacity", self.pool.capacity),
            ("pool.buffer_size", self.pool.buffer_size),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(Error::new(ErrorKind::Config(format!(
                    "{} must be greater than zero",
                    field
                ))));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = RuntimeConfig::from_toml_str("").unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_partial_section() {
        let config = RuntimeConfig::from_toml_str("[scheduler]\nmax_threads = 2\n").unwrap();
        assert_eq!(config.scheduler.max_threads, 2);
        assert_eq!(
            config.scheduler.command_queue_capacity,
            DEFAULT_COMMAND_QUEUE_CAPACITY
        );
        assert_eq!(config.queue.default_capacity, DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = RuntimeConfig::from_toml_str("[queue]\ndefault_capacity = 0\n").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Config(msg) if msg.contains("queue.default_capacity")));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(RuntimeConfig::from_toml_str("[scheduler\n").is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = RuntimeConfig::default();
        config.logging.filter = "debug".to_string();
        let text = config.to_toml_string().unwrap();
        assert_eq!(RuntimeConfig::from_toml_str(&text).unwrap(), config);
    }
}
