//! # Domain Errors
//!
//! Storage failures. The writer never surfaces these: it converts every
//! one of them into a `BlockPersistenceStatus`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Checksum mismatch, bad magic or undecodable payload.
    #[error("Artifact for block {block_number} is corrupted: {reason}")]
    Corrupted { block_number: u64, reason: String },

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Compression failed: {0}")]
    Compression(String),

    #[error("No unverified artifact for block {0}")]
    MissingUnverified(u64),

    /// Failure raised on purpose by a test storage.
    #[error("Simulated storage failure: {0}")]
    Simulated(&'static str),

    #[error("Storage task failed: {0}")]
    Task(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
