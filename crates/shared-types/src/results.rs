//! # Pipeline Results
//!
//! Terminal outcomes reported by the writer and the verification session.
//! Both are plain values: neither component ever fails with an error.

use std::fmt;

use crate::entities::{BlockHash, MerkleTreeInfo};

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Terminal status of one block writer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockPersistenceStatus {
    Success,
    /// Proof missing, unparsable or naming another block.
    BadBlockNumber,
    /// The block was closed without a proof.
    IncompleteBlock,
    FailureDuringWrite,
    /// Shutdown while waiting for items or while writing.
    PersistenceInterrupted,
    /// A verified copy of this block number already exists.
    DuplicateBlock,
    /// Reverting a failed write failed as well.
    FailureDuringRevert,
}

impl BlockPersistenceStatus {
    /// The block is durably stored (freshly written or already present).
    pub fn is_persisted(self) -> bool {
        matches!(self, Self::Success | Self::DuplicateBlock)
    }

    /// Expected outcomes that discard the block without escalation.
    pub fn is_absorbed(self) -> bool {
        matches!(self, Self::IncompleteBlock | Self::PersistenceInterrupted)
    }

    pub fn is_failure(self) -> bool {
        !self.is_persisted() && !self.is_absorbed()
    }

    /// Signals an internal bug rather than an expected fault.
    pub fn is_unrecoverable(self) -> bool {
        matches!(self, Self::FailureDuringRevert)
    }
}

impl fmt::Display for BlockPersistenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "SUCCESS",
            Self::BadBlockNumber => "BAD_BLOCK_NUMBER",
            Self::IncompleteBlock => "INCOMPLETE_BLOCK",
            Self::FailureDuringWrite => "FAILURE_DURING_WRITE",
            Self::PersistenceInterrupted => "PERSISTENCE_INTERRUPTED",
            Self::DuplicateBlock => "DUPLICATE_BLOCK",
            Self::FailureDuringRevert => "FAILURE_DURING_REVERT",
        };
        f.write_str(s)
    }
}

/// Produced exactly once per writer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockPersistenceResult {
    pub block_number: u64,
    pub status: BlockPersistenceStatus,
}

impl BlockPersistenceResult {
    pub fn new(block_number: u64, status: BlockPersistenceStatus) -> Self {
        Self {
            block_number,
            status,
        }
    }
}

// =============================================================================
// VERIFICATION
// =============================================================================

/// Terminal status of one verification session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockVerificationStatus {
    Verified,
    InvalidHashOrSignature,
    /// The block could not be processed (malformed item, interruption).
    Error,
}

impl fmt::Display for BlockVerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Verified => "VERIFIED",
            Self::InvalidHashOrSignature => "INVALID_HASH_OR_SIGNATURE",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Outcome of verifying one block.
///
/// `block_hash` and `merkle_tree_info` are present whenever the block hash
/// could be computed, i.e. for every status except `Error`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResult {
    pub block_number: u64,
    pub status: BlockVerificationStatus,
    pub block_hash: Option<BlockHash>,
    pub merkle_tree_info: Option<MerkleTreeInfo>,
}

impl VerificationResult {
    pub fn computed(
        block_number: u64,
        status: BlockVerificationStatus,
        merkle_tree_info: MerkleTreeInfo,
    ) -> Self {
        Self {
            block_number,
            status,
            block_hash: Some(merkle_tree_info.block_hash),
            merkle_tree_info: Some(merkle_tree_info),
        }
    }

    pub fn error(block_number: u64) -> Self {
        Self {
            block_number,
            status: BlockVerificationStatus::Error,
            block_hash: None,
            merkle_tree_info: None,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.status == BlockVerificationStatus::Verified
    }
}
