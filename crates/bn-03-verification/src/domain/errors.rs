//! Verification errors.
//!
//! A signature mismatch is *not* an error: it is the
//! `INVALID_HASH_OR_SIGNATURE` outcome. These variants cover the cases where
//! no block hash could be computed at all.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// An item of the block could not be parsed or encoded.
    #[error("Malformed item in block {block_number}: {reason}")]
    MalformedItem { block_number: u64, reason: String },

    /// The closing proof names another block.
    #[error("Proof closes block {found}, session verifies block {expected}")]
    ProofMismatch { expected: u64, found: u64 },

    /// The session was stopped (shutdown or superseded) before its proof.
    #[error("Verification of block {0} interrupted")]
    Interrupted(u64),

    /// The hashing pool dropped a job.
    #[error("Verification pool unavailable: {0}")]
    Pool(String),

    #[error("Invalid verification configuration: {0}")]
    InvalidConfig(String),
}

impl VerificationError {
    /// Interruption ends a session without a verdict on its block.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted(_))
    }
}
