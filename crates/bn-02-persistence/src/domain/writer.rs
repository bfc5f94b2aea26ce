//! # Async Block Writer
//!
//! One writer per in-flight block number.
//!
//! ```text
//!                 ┌─────────────────┐
//!   Item ───────► │ AWAITING_ITEMS  │ ── EndOfBlock ──► INCOMPLETE_BLOCK
//!                 └────────┬────────┘ ── shutdown ────► PERSISTENCE_INTERRUPTED
//!                          │ proof
//!                          ▼
//!           earlier copy in flight? ── persisted ──► DUPLICATE_BLOCK
//!                          │ none, or it failed
//!                          ▼
//!              verified copy exists? ── yes ──► DUPLICATE_BLOCK
//!                          │ no
//!                          ▼
//!                        write ── ok ──► SUCCESS
//!                          │ fail
//!                          ▼
//!                        revert ── ok ──► FAILURE_DURING_WRITE
//!                          └───── fail ──► FAILURE_DURING_REVERT
//! ```
//!
//! Items are buffered until the proof arrives and written as one artifact,
//! so nothing reaches storage for a block that never completes. Every path
//! ends in exactly one [`BlockPersistenceResult`], reported to the ack
//! handler before the writer exits.

use std::sync::Arc;

use bn_telemetry::BlockNodeMetrics;
use shared_types::{AckHandler, BlockItem, BlockPersistenceResult, BlockPersistenceStatus};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::domain::errors::StorageError;
use crate::domain::in_flight::{Claim, ClaimGuard, InFlightBlocks};
use crate::ports::outbound::BlockStorage;

/// Element of a writer's queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriterMessage {
    Item(BlockItem),
    /// The block ended without a proof.
    EndOfBlock,
}

pub struct AsyncBlockWriter {
    block_number: u64,
    queue: mpsc::Receiver<WriterMessage>,
    storage: Arc<dyn BlockStorage>,
    ack_handler: Arc<dyn AckHandler>,
    metrics: Arc<BlockNodeMetrics>,
    shutdown: watch::Receiver<bool>,
    in_flight: InFlightBlocks,
}

impl AsyncBlockWriter {
    pub fn new(
        block_number: u64,
        queue: mpsc::Receiver<WriterMessage>,
        storage: Arc<dyn BlockStorage>,
        ack_handler: Arc<dyn AckHandler>,
        metrics: Arc<BlockNodeMetrics>,
        shutdown: watch::Receiver<bool>,
        in_flight: InFlightBlocks,
    ) -> Self {
        Self {
            block_number,
            queue,
            storage,
            ack_handler,
            metrics,
            shutdown,
            in_flight,
        }
    }

    /// Run to completion, report the result and return it.
    pub async fn run(mut self) -> BlockPersistenceResult {
        let (status, claim) = self.persist().await;
        let result = BlockPersistenceResult::new(self.block_number, status);

        if status.is_persisted() {
            self.metrics.blocks_persisted.inc();
            info!(block_number = self.block_number, status = %status, "Block persisted");
        } else {
            self.metrics.block_persistence_errors.inc();
            warn!(block_number = self.block_number, status = %status, "Block not persisted");
        }

        self.ack_handler.block_persisted(result).await;
        // Waiting copies see the outcome only after it has been reported.
        if let Some(claim) = claim {
            claim.release(status);
        }
        result
    }

    async fn persist(&mut self) -> (BlockPersistenceStatus, Option<ClaimGuard>) {
        let items = match self.collect_items().await {
            Ok(items) => items,
            Err(status) => return (status, None),
        };

        if !self.proof_matches(&items) {
            return (BlockPersistenceStatus::BadBlockNumber, None);
        }

        let claim = match self.in_flight.claim(self.block_number).await {
            Claim::Owned(claim) => claim,
            Claim::AlreadyPersisted => {
                debug!(block_number = self.block_number, "Earlier copy persisted");
                return (BlockPersistenceStatus::DuplicateBlock, None);
            }
        };
        (self.write_claimed(items).await, Some(claim))
    }

    async fn write_claimed(&self, items: Vec<BlockItem>) -> BlockPersistenceStatus {
        match self.on_storage(|s, n| s.exists_verified(n)).await {
            Ok(true) => return BlockPersistenceStatus::DuplicateBlock,
            Ok(false) => {}
            Err(e) => {
                error!(block_number = self.block_number, error = %e, "Duplicate check failed");
                return BlockPersistenceStatus::FailureDuringWrite;
            }
        }

        let written = self
            .on_storage(move |s, n| s.write_unverified(n, &items))
            .await;
        // A write cannot be cancelled half way; interruption is honoured once it returns.
        let interrupted = *self.shutdown.borrow();

        match written {
            Ok(path) if !interrupted => {
                debug!(block_number = self.block_number, path = %path.display(), "Write complete");
                BlockPersistenceStatus::Success
            }
            Ok(_) => {
                info!(block_number = self.block_number, "Interrupted during write");
                self.revert(BlockPersistenceStatus::PersistenceInterrupted)
                    .await
            }
            Err(e) => {
                warn!(block_number = self.block_number, error = %e, "Write failed");
                self.revert(BlockPersistenceStatus::FailureDuringWrite).await
            }
        }
    }

    /// Read the queue up to and including the proof.
    async fn collect_items(&mut self) -> Result<Vec<BlockItem>, BlockPersistenceStatus> {
        let mut items = Vec::new();
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.wait_for(|stop| *stop) => {
                    info!(block_number = self.block_number, "Interrupted while awaiting items");
                    return Err(BlockPersistenceStatus::PersistenceInterrupted);
                }
                message = self.queue.recv() => match message {
                    Some(WriterMessage::Item(item)) => {
                        let closes_block = item.has_block_proof();
                        items.push(item);
                        if closes_block {
                            return Ok(items);
                        }
                    }
                    Some(WriterMessage::EndOfBlock) => {
                        return Err(BlockPersistenceStatus::IncompleteBlock);
                    }
                    None => {
                        debug!(block_number = self.block_number, "Writer queue closed");
                        return Err(BlockPersistenceStatus::PersistenceInterrupted);
                    }
                },
            }
        }
    }

    fn proof_matches(&self, items: &[BlockItem]) -> bool {
        let Some(last) = items.last() else {
            return false;
        };
        match last.block_proof() {
            Ok(proof) if proof.block == self.block_number => true,
            Ok(proof) => {
                warn!(
                    block_number = self.block_number,
                    proof_block = proof.block,
                    "Proof closes a different block"
                );
                false
            }
            Err(e) => {
                warn!(block_number = self.block_number, error = %e, "Unreadable proof");
                false
            }
        }
    }

    /// Remove whatever this writer may have left behind.
    async fn revert(&self, status: BlockPersistenceStatus) -> BlockPersistenceStatus {
        match self.on_storage(|s, n| s.remove_unverified(n)).await {
            Ok(()) => status,
            Err(e) => {
                error!(
                    block_number = self.block_number,
                    error = %e,
                    "Revert failed, partial artifact may remain"
                );
                BlockPersistenceStatus::FailureDuringRevert
            }
        }
    }

    async fn on_storage<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn BlockStorage, u64) -> Result<T, StorageError> + Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        let block_number = self.block_number;
        tokio::task::spawn_blocking(move || op(storage.as_ref(), block_number))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }
}
