//! Node-level errors.

use bn_03_verification::VerificationError;
use bn_telemetry::TelemetryError;
use shared_crypto::CryptoError;
use shared_types::SubscribeStreamStatus;
use thiserror::Error;

use crate::container::ConfigError;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("Verification setup failed: {0}")]
    Verification(#[from] VerificationError),

    #[error("Invalid producer key: {0}")]
    Crypto(#[from] CryptoError),

    /// The node has stopped accepting streams.
    #[error("Block node is not accepting streams")]
    NotAvailable,

    #[error("Start block {requested} is ahead of the next block {next}")]
    InvalidStartBlock { requested: u64, next: u64 },

    #[error("Start block {requested} is historic, live streaming starts at {next}")]
    HistoricNotAvailable { requested: u64, next: u64 },
}

impl NodeError {
    /// Status a consumer receives when its subscription is refused.
    pub fn stream_status(&self) -> SubscribeStreamStatus {
        match self {
            Self::InvalidStartBlock { .. } => SubscribeStreamStatus::ReadStreamInvalidStartBlockNumber,
            _ => SubscribeStreamStatus::ReadStreamNotAvailable,
        }
    }
}
