use std::env;
use std::fmt;
use std::str::FromStr;

use crate::TelemetryError;

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, one line per event.
    #[default]
    Plain,
    /// One JSON object per event, for log shippers.
    Json,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            other => Err(TelemetryError::Config(format!(
                "unknown log format {other:?}, expected plain or json"
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plain => "plain",
            Self::Json => "json",
        })
    }
}

/// Logging settings for one node process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Attached to the start-up log line.
    pub service_name: String,
    /// `EnvFilter` directives, e.g. `info,bn_02_persistence=debug`.
    pub log_filter: String,
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "block-node".to_string(),
            log_filter: "info".to_string(),
            format: LogFormat::Plain,
        }
    }
}

impl TelemetryConfig {
    /// Defaults overridden by `BN_SERVICE_NAME`, `BN_LOG_LEVEL` (falling back
    /// to `RUST_LOG`) and `BN_LOG_FORMAT`.
    pub fn from_env() -> Result<Self, TelemetryError> {
        let mut config = Self::default();
        if let Ok(name) = env::var("BN_SERVICE_NAME") {
            config.service_name = name;
        }
        if let Ok(filter) = env::var("BN_LOG_LEVEL").or_else(|_| env::var("RUST_LOG")) {
            config.log_filter = filter;
        }
        if let Ok(format) = env::var("BN_LOG_FORMAT") {
            config.format = format.parse()?;
        }
        Ok(config)
    }
}
