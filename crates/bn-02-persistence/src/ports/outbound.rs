//! # Outbound Ports
//!
//! What the writer needs from durable storage.

use std::path::PathBuf;

use shared_types::BlockItem;

use crate::domain::errors::StorageError;

/// Block artifact storage with distinct unverified and verified states.
///
/// An artifact is written as unverified by its writer and only promoted to
/// verified once the block is final. Duplicate detection looks at verified
/// artifacts only.
///
/// Implementations are blocking; async callers go through
/// `spawn_blocking`.
pub trait BlockStorage: Send + Sync {
    /// Is there a finalized artifact for this block number?
    fn exists_verified(&self, block_number: u64) -> Result<bool, StorageError>;

    /// Is there an in-progress artifact for this block number?
    fn exists_unverified(&self, block_number: u64) -> Result<bool, StorageError>;

    /// Store the ordered items of one block as an unverified artifact.
    fn write_unverified(
        &self,
        block_number: u64,
        items: &[BlockItem],
    ) -> Result<PathBuf, StorageError>;

    /// Delete the unverified artifact, including partial data. Idempotent.
    fn remove_unverified(&self, block_number: u64) -> Result<(), StorageError>;

    /// Promote the unverified artifact to verified.
    fn mark_verified(&self, block_number: u64) -> Result<(), StorageError>;

    /// Items of the verified artifact, else of the unverified one.
    fn read_block(&self, block_number: u64) -> Result<Option<Vec<BlockItem>>, StorageError>;
}
