//! # Error Types
//!
//! Errors shared by every pipeline crate.

use thiserror::Error;

/// Failure to encode or parse a block item payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemCodecError {
    #[error("Malformed block header: {0}")]
    MalformedHeader(String),

    #[error("Malformed block proof: {0}")]
    MalformedProof(String),

    #[error("Expected a {expected} item, found {found}")]
    UnexpectedKind {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Item encoding failed: {0}")]
    Encode(String),
}
