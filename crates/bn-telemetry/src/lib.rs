//! # Block Node Telemetry
//!
//! Logging and metrics for the block node.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bn_telemetry::{init_logging, BlockNodeMetrics, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env()?;
//! init_logging(&config)?;
//! let metrics = std::sync::Arc::new(BlockNodeMetrics::new()?);
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BN_SERVICE_NAME` | `block-node` | Service name in the start-up line |
//! | `BN_LOG_LEVEL` / `RUST_LOG` | `info` | `EnvFilter` directives |
//! | `BN_LOG_FORMAT` | `plain` | `plain` or `json` |

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
mod logging;
mod metrics;

pub use config::{LogFormat, TelemetryConfig};
pub use logging::init_logging;
pub use metrics::BlockNodeMetrics;

use thiserror::Error;

/// Logging and metrics set-up failures.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("tracing subscriber not installed: {0}")]
    LoggingInit(String),

    #[error("metric registration failed: {0}")]
    MetricsInit(String),

    #[error("bad telemetry setting: {0}")]
    Config(String),
}
