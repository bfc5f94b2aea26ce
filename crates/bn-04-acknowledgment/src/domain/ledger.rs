//! # Acknowledgement Ledger
//!
//! Pairs the two independent results of each block number and releases
//! blocks for acknowledgement strictly in order.
//!
//! ```text
//!   block_persisted(n) ──┐                      ┌── n < next_expected ──► Stale
//!                        ├──► PendingBlock(n) ──┤
//!   block_verified(n)  ──┘                      └── both halves final ──► ready
//!
//!   take_ready(): only `next_expected` is ever released, so block n+1 waits
//!   in the buffer until block n is acknowledged.
//! ```
//!
//! The ledger is pure state. It never performs I/O and never logs; the
//! coordinator acts on the [`Verdict`]s it returns.

use std::collections::BTreeMap;
use std::fmt;

use shared_types::{
    BlockHash, BlockPersistenceResult, BlockPersistenceStatus, BlockVerificationStatus,
    EndOfStreamCode, VerificationResult,
};

/// Why the node must stop ingesting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureCause {
    Persistence {
        block_number: u64,
        status: BlockPersistenceStatus,
    },
    Verification {
        block_number: u64,
        status: BlockVerificationStatus,
    },
    /// A finalized block could not be promoted to verified storage.
    Promotion { block_number: u64, reason: String },
    /// Reported without a block number (e.g. an unparsable header).
    Unrecoverable(String),
}

impl FailureCause {
    pub fn block_number(&self) -> Option<u64> {
        match self {
            Self::Persistence { block_number, .. }
            | Self::Verification { block_number, .. }
            | Self::Promotion { block_number, .. } => Some(*block_number),
            Self::Unrecoverable(_) => None,
        }
    }

    /// Reason code sent to producers and consumers.
    pub fn end_of_stream_code(&self) -> EndOfStreamCode {
        match self {
            Self::Persistence { .. } | Self::Promotion { .. } => {
                EndOfStreamCode::StreamItemsPersistenceFailed
            }
            Self::Verification {
                status: BlockVerificationStatus::InvalidHashOrSignature,
                ..
            } => EndOfStreamCode::StreamItemsBadStateProof,
            Self::Verification { .. } | Self::Unrecoverable(_) => {
                EndOfStreamCode::StreamItemsInternalError
            }
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persistence {
                block_number,
                status,
            } => write!(f, "block {block_number} persistence {status}"),
            Self::Verification {
                block_number,
                status,
            } => write!(f, "block {block_number} verification {status}"),
            Self::Promotion {
                block_number,
                reason,
            } => write!(f, "block {block_number} promotion failed: {reason}"),
            Self::Unrecoverable(reason) => write!(f, "unrecoverable: {reason}"),
        }
    }
}

/// What recording one result led to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Stored; the block may now be ready.
    Recorded,
    /// The block's partial state was dropped, no escalation.
    Discarded { block_number: u64 },
    /// The block number is already behind the cursor.
    Stale { block_number: u64 },
    /// A later copy of a block that is already persisted; nothing changed.
    Superseded { block_number: u64 },
    Failed(FailureCause),
}

/// A block whose two halves are both final.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadyBlock {
    pub block_number: u64,
    pub block_hash: BlockHash,
    /// Persisted as `DUPLICATE_BLOCK`: the verified artifact already exists.
    pub already_existed: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct PendingBlock {
    persisted: Option<BlockPersistenceStatus>,
    verified_hash: Option<BlockHash>,
}

#[derive(Debug)]
pub struct AckLedger {
    pending: BTreeMap<u64, PendingBlock>,
    last_acknowledged: Option<u64>,
    first_block_number: u64,
}

impl AckLedger {
    pub fn new(first_block_number: u64) -> Self {
        Self {
            pending: BTreeMap::new(),
            last_acknowledged: None,
            first_block_number,
        }
    }

    pub fn last_acknowledged(&self) -> Option<u64> {
        self.last_acknowledged
    }

    /// The only block number that can be acknowledged next.
    pub fn next_expected(&self) -> u64 {
        self.last_acknowledged
            .map_or(self.first_block_number, |n| n.saturating_add(1))
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn record_persisted(&mut self, result: BlockPersistenceResult) -> Verdict {
        let BlockPersistenceResult {
            block_number,
            status,
        } = result;
        let failed = Verdict::Failed(FailureCause::Persistence {
            block_number,
            status,
        });

        if block_number < self.next_expected() {
            return if status.is_unrecoverable() {
                failed
            } else {
                Verdict::Stale { block_number }
            };
        }
        if status.is_failure() {
            return failed;
        }
        let already_persisted = self
            .pending
            .get(&block_number)
            .and_then(|entry| entry.persisted);

        if status.is_absorbed() {
            if already_persisted.is_some() {
                return Verdict::Superseded { block_number };
            }
            self.pending.remove(&block_number);
            return Verdict::Discarded { block_number };
        }

        // The written copy wins, its artifact still needs promoting.
        if already_persisted == Some(BlockPersistenceStatus::Success) {
            return Verdict::Superseded { block_number };
        }
        self.pending.entry(block_number).or_default().persisted = Some(status);
        Verdict::Recorded
    }

    pub fn record_verified(&mut self, result: VerificationResult) -> Verdict {
        let block_number = result.block_number;
        let failed = |status| {
            Verdict::Failed(FailureCause::Verification {
                block_number,
                status,
            })
        };

        if block_number < self.next_expected() {
            return if result.status == BlockVerificationStatus::Error {
                failed(result.status)
            } else {
                Verdict::Stale { block_number }
            };
        }
        match (result.status, result.block_hash) {
            (BlockVerificationStatus::Verified, Some(hash)) => {
                self.pending.entry(block_number).or_default().verified_hash = Some(hash);
                Verdict::Recorded
            }
            (BlockVerificationStatus::Verified, None) => failed(BlockVerificationStatus::Error),
            (status, _) => failed(status),
        }
    }

    /// Remove and return the next block if both its halves are in.
    pub fn take_ready(&mut self) -> Option<ReadyBlock> {
        let block_number = self.next_expected();
        let entry = self.pending.get(&block_number)?;
        let (Some(status), Some(block_hash)) = (entry.persisted, entry.verified_hash) else {
            return None;
        };
        self.pending.remove(&block_number);
        Some(ReadyBlock {
            block_number,
            block_hash,
            already_existed: status == BlockPersistenceStatus::DuplicateBlock,
        })
    }

    /// Advance the cursor past `block_number`, which must be
    /// [`next_expected`](Self::next_expected).
    pub fn acknowledge(&mut self, block_number: u64) {
        debug_assert_eq!(
            block_number,
            self.next_expected(),
            "acknowledgement out of order"
        );
        self.last_acknowledged = Some(block_number);
    }

    /// Drop all partial state.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::MerkleTreeInfo;

    fn persisted(block_number: u64, status: BlockPersistenceStatus) -> BlockPersistenceResult {
        BlockPersistenceResult::new(block_number, status)
    }

    fn verified(block_number: u64) -> VerificationResult {
        let hash = [block_number as u8; 48];
        VerificationResult::computed(
            block_number,
            BlockVerificationStatus::Verified,
            MerkleTreeInfo {
                input_tree_leaves: vec![],
                output_tree_leaves: vec![],
                previous_block_root_hash: hash,
                start_of_block_state_root_hash: hash,
                block_hash: hash,
            },
        )
    }

    fn drain(ledger: &mut AckLedger) -> Vec<u64> {
        let mut released = Vec::new();
        while let Some(ready) = ledger.take_ready() {
            ledger.acknowledge(ready.block_number);
            released.push(ready.block_number);
        }
        released
    }

    #[test]
    fn test_pair_in_either_order_releases() {
        let mut ledger = AckLedger::new(1);
        assert_eq!(ledger.record_verified(verified(1)), Verdict::Recorded);
        assert!(ledger.take_ready().is_none());
        assert_eq!(
            ledger.record_persisted(persisted(1, BlockPersistenceStatus::Success)),
            Verdict::Recorded
        );

        let ready = ledger.take_ready().unwrap();
        assert_eq!(ready.block_number, 1);
        assert!(!ready.already_existed);
    }

    #[test]
    fn test_later_block_waits_for_earlier() {
        let mut ledger = AckLedger::new(1);
        ledger.record_persisted(persisted(2, BlockPersistenceStatus::Success));
        ledger.record_verified(verified(2));
        assert!(drain(&mut ledger).is_empty());

        ledger.record_verified(verified(1));
        ledger.record_persisted(persisted(1, BlockPersistenceStatus::Success));
        assert_eq!(drain(&mut ledger), vec![1, 2]);
        assert_eq!(ledger.last_acknowledged(), Some(2));
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn test_duplicate_is_ready_and_flagged() {
        let mut ledger = AckLedger::new(5);
        ledger.record_persisted(persisted(5, BlockPersistenceStatus::DuplicateBlock));
        ledger.record_verified(verified(5));
        assert!(ledger.take_ready().unwrap().already_existed);
    }

    #[test]
    fn test_results_behind_cursor_are_stale() {
        let mut ledger = AckLedger::new(1);
        ledger.record_persisted(persisted(1, BlockPersistenceStatus::Success));
        ledger.record_verified(verified(1));
        drain(&mut ledger);

        assert_eq!(
            ledger.record_persisted(persisted(1, BlockPersistenceStatus::DuplicateBlock)),
            Verdict::Stale { block_number: 1 }
        );
        assert_eq!(ledger.record_verified(verified(1)), Verdict::Stale { block_number: 1 });
        assert!(matches!(
            ledger.record_persisted(persisted(1, BlockPersistenceStatus::FailureDuringRevert)),
            Verdict::Failed(_)
        ));
        assert!(matches!(
            ledger.record_verified(VerificationResult::error(1)),
            Verdict::Failed(_)
        ));
    }

    #[test]
    fn test_absorbed_status_discards_partial_state() {
        let mut ledger = AckLedger::new(1);
        ledger.record_verified(verified(1));
        assert_eq!(
            ledger.record_persisted(persisted(1, BlockPersistenceStatus::IncompleteBlock)),
            Verdict::Discarded { block_number: 1 }
        );
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn test_truncated_copy_keeps_completed_block() {
        let mut ledger = AckLedger::new(1);
        ledger.record_persisted(persisted(2, BlockPersistenceStatus::Success));
        ledger.record_verified(verified(2));

        assert_eq!(
            ledger.record_persisted(persisted(2, BlockPersistenceStatus::IncompleteBlock)),
            Verdict::Superseded { block_number: 2 }
        );
        assert_eq!(
            ledger.record_persisted(persisted(2, BlockPersistenceStatus::PersistenceInterrupted)),
            Verdict::Superseded { block_number: 2 }
        );

        ledger.record_persisted(persisted(1, BlockPersistenceStatus::Success));
        ledger.record_verified(verified(1));
        assert_eq!(drain(&mut ledger), vec![1, 2]);
    }

    #[test]
    fn test_second_copy_does_not_hide_the_write() {
        let mut ledger = AckLedger::new(1);
        ledger.record_persisted(persisted(1, BlockPersistenceStatus::Success));
        assert_eq!(
            ledger.record_persisted(persisted(1, BlockPersistenceStatus::DuplicateBlock)),
            Verdict::Superseded { block_number: 1 }
        );
        ledger.record_verified(verified(1));

        let ready = ledger.take_ready().unwrap();
        assert!(!ready.already_existed, "the written artifact must still be promoted");
    }

    #[test]
    fn test_failures_map_to_end_of_stream_codes() {
        let mut ledger = AckLedger::new(1);
        let Verdict::Failed(write) =
            ledger.record_persisted(persisted(1, BlockPersistenceStatus::FailureDuringWrite))
        else {
            panic!("write failure must fail");
        };
        assert_eq!(
            write.end_of_stream_code(),
            EndOfStreamCode::StreamItemsPersistenceFailed
        );

        let mut invalid = verified(2);
        invalid.status = BlockVerificationStatus::InvalidHashOrSignature;
        let Verdict::Failed(bad_proof) = ledger.record_verified(invalid) else {
            panic!("invalid signature must fail");
        };
        assert_eq!(
            bad_proof.end_of_stream_code(),
            EndOfStreamCode::StreamItemsBadStateProof
        );
        assert_eq!(bad_proof.block_number(), Some(2));
        assert_eq!(
            FailureCause::Unrecoverable("x".into()).end_of_stream_code(),
            EndOfStreamCode::StreamItemsInternalError
        );
    }
}
