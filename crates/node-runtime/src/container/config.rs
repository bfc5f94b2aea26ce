//! # Node Configuration
//!
//! Unified configuration for every subsystem and the runtime itself.
//!
//! ## Environment Overrides
//!
//! | Variable | Field |
//! |----------|-------|
//! | `BN_QUEUE_CAPACITY` | `mediator.queue_capacity` |
//! | `BN_PUBLISH_TIMEOUT_MS` | `mediator.publish_timeout` |
//! | `BN_ROOT_PATH` | `persistence.root_path` |
//! | `BN_COMPRESSION` | `persistence.compression` (`none` or `zstd`) |
//! | `BN_COMPRESSION_LEVEL` | `persistence.compression_level` |
//! | `BN_WRITER_QUEUE_CAPACITY` | `persistence.writer_queue_capacity` |
//! | `BN_SESSION_TYPE` | `verification.session_type` (`sync` or `async`) |
//! | `BN_HASH_COMBINE_BATCH_SIZE` | `verification.hash_combine_batch_size` |
//! | `BN_VERIFICATION_THREADS` | `verification.worker_threads` |
//! | `BN_PUBLIC_KEY` | `verification.public_key_hex` |
//! | `BN_SKIP_ACKNOWLEDGEMENT` | `ack.skip_acknowledgement` |
//! | `BN_FIRST_BLOCK_NUMBER` | `ack.first_block_number` |
//! | `BN_SHUTDOWN_DELAY_MS` | `service.shutdown_delay` |
//! | `BN_CONSUMER_TIMEOUT_MS` | `consumer.timeout_threshold` |
//!
//! Telemetry variables are documented in `bn-telemetry`.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use bn_02_persistence::{CompressionConfig, CompressionKind, DEFAULT_WRITER_QUEUE_CAPACITY};
use bn_03_verification::{SessionType, VerificationConfig};
use bn_04_acknowledgment::{AckConfig, DEFAULT_RESPONSE_CAPACITY};
use bn_telemetry::TelemetryConfig;
use shared_bus::MediatorConfig;
use thiserror::Error;

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    pub mediator: MediatorConfig,
    pub persistence: PersistenceConfig,
    pub verification: VerificationConfig,
    pub ack: AckConfig,
    pub service: ServiceConfig,
    pub consumer: ConsumerConfig,
    pub telemetry: TelemetryConfig,
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}: {reason}")]
    InvalidVariable {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{field} must be positive")]
    NotPositive { field: &'static str },

    #[error("Invalid verification settings: {0}")]
    Verification(String),

    #[error("Compression level {0} outside 1..=22")]
    CompressionLevel(i32),

    #[error("Invalid telemetry settings: {0}")]
    Telemetry(String),
}

/// Block storage settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceConfig {
    pub root_path: PathBuf,
    pub compression: CompressionKind,
    pub compression_level: i32,
    pub writer_queue_capacity: usize,
}

impl PersistenceConfig {
    pub fn compression_config(&self) -> CompressionConfig {
        CompressionConfig {
            kind: self.compression,
            level: self.compression_level,
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("./data/blocks"),
            compression: CompressionKind::None,
            compression_level: 3,
            writer_queue_capacity: DEFAULT_WRITER_QUEUE_CAPACITY,
        }
    }
}

/// Process-wide service status settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// How long the listener keeps running after a node-wide failure.
    pub shutdown_delay: Duration,
    /// Responses buffered per producer.
    pub response_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            shutdown_delay: Duration::from_millis(500),
            response_capacity: DEFAULT_RESPONSE_CAPACITY,
        }
    }
}

/// Live consumer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// A consumer that leaves its stream undrained this long is unsubscribed.
    pub timeout_threshold: Duration,
    /// Responses buffered per consumer before the timeout starts counting.
    pub buffer_capacity: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            timeout_threshold: Duration::from_millis(1500),
            buffer_capacity: 1024,
        }
    }
}

impl NodeConfig {
    /// Defaults overridden by `BN_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self {
            telemetry: TelemetryConfig::from_env()
                .map_err(|e| ConfigError::Telemetry(e.to_string()))?,
            ..Self::default()
        };

        if let Some(v) = parsed::<usize>("BN_QUEUE_CAPACITY")? {
            config.mediator.queue_capacity = v;
        }
        if let Some(v) = parsed::<u64>("BN_PUBLISH_TIMEOUT_MS")? {
            config.mediator.publish_timeout = Duration::from_millis(v);
        }

        if let Some(v) = var("BN_ROOT_PATH") {
            config.persistence.root_path = PathBuf::from(v);
        }
        if let Some(v) = var("BN_COMPRESSION") {
            config.persistence.compression = match v.to_ascii_lowercase().as_str() {
                "none" => CompressionKind::None,
                "zstd" => CompressionKind::Zstd,
                _ => {
                    return Err(ConfigError::InvalidVariable {
                        name: "BN_COMPRESSION",
                        value: v,
                        reason: "expected none or zstd".into(),
                    })
                }
            };
        }
        if let Some(v) = parsed::<i32>("BN_COMPRESSION_LEVEL")? {
            config.persistence.compression_level = v;
        }
        if let Some(v) = parsed::<usize>("BN_WRITER_QUEUE_CAPACITY")? {
            config.persistence.writer_queue_capacity = v;
        }

        if let Some(v) = parsed::<SessionType>("BN_SESSION_TYPE")? {
            config.verification.session_type = v;
        }
        if let Some(v) = parsed::<usize>("BN_HASH_COMBINE_BATCH_SIZE")? {
            config.verification.hash_combine_batch_size = v;
        }
        if let Some(v) = parsed::<usize>("BN_VERIFICATION_THREADS")? {
            config.verification.worker_threads = v;
        }
        if let Some(v) = var("BN_PUBLIC_KEY") {
            config.verification.public_key_hex = Some(v);
        }

        if let Some(v) = parsed::<bool>("BN_SKIP_ACKNOWLEDGEMENT")? {
            config.ack.skip_acknowledgement = v;
        }
        if let Some(v) = parsed::<u64>("BN_FIRST_BLOCK_NUMBER")? {
            config.ack.first_block_number = v;
        }

        if let Some(v) = parsed::<u64>("BN_SHUTDOWN_DELAY_MS")? {
            config.service.shutdown_delay = Duration::from_millis(v);
        }
        if let Some(v) = parsed::<u64>("BN_CONSUMER_TIMEOUT_MS")? {
            config.consumer.timeout_threshold = Duration::from_millis(v);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mediator.queue_capacity == 0 {
            return Err(ConfigError::NotPositive {
                field: "mediator.queue_capacity",
            });
        }
        if self.mediator.publish_timeout.is_zero() {
            return Err(ConfigError::NotPositive {
                field: "mediator.publish_timeout",
            });
        }
        if self.persistence.writer_queue_capacity == 0 {
            return Err(ConfigError::NotPositive {
                field: "persistence.writer_queue_capacity",
            });
        }
        if !(1..=22).contains(&self.persistence.compression_level) {
            return Err(ConfigError::CompressionLevel(
                self.persistence.compression_level,
            ));
        }
        if self.consumer.timeout_threshold.is_zero() {
            return Err(ConfigError::NotPositive {
                field: "consumer.timeout_threshold",
            });
        }
        if self.consumer.buffer_capacity == 0 {
            return Err(ConfigError::NotPositive {
                field: "consumer.buffer_capacity",
            });
        }
        self.verification
            .validate()
            .map_err(|e| ConfigError::Verification(e.to_string()))
    }
}

fn var(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidVariable {
                    name,
                    reason: e.to_string(),
                    value,
                })
        })
        .transpose()
}
