//! # In-Flight Block Claims
//!
//! Redundant producers can publish the same block number while an earlier
//! copy is still being written. Only one writer per block number may touch
//! storage at a time. A later copy waits for the earlier writer's outcome:
//! if that writer persisted the block, the later copy is a duplicate and is
//! never written; otherwise the later copy takes over the claim.
//!
//! A persisted block stays claimed until its artifact is promoted or
//! removed ([`InFlightBlocks::forget`]), so a copy arriving in between is
//! still a duplicate.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use shared_types::BlockPersistenceStatus;
use tokio::sync::watch;

type Outcome = Option<BlockPersistenceStatus>;

/// Block numbers being written, or written and not yet finalized.
#[derive(Clone, Default)]
pub struct InFlightBlocks {
    claims: Arc<Mutex<HashMap<u64, watch::Receiver<Outcome>>>>,
}

/// Result of [`InFlightBlocks::claim`].
pub enum Claim {
    /// This writer owns the block number until the guard is released.
    Owned(ClaimGuard),
    /// An earlier writer of the same block number persisted it.
    AlreadyPersisted,
}

impl InFlightBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_claimed(&self, block_number: u64) -> bool {
        self.claims.lock().contains_key(&block_number)
    }

    /// Drop the claim of a persisted block once its artifact is finalized.
    /// Claims of writers still running are left alone.
    pub fn forget(&self, block_number: u64) {
        let mut claims = self.claims.lock();
        let finished = claims
            .get(&block_number)
            .is_some_and(|outcome| outcome.borrow().is_some());
        if finished {
            claims.remove(&block_number);
        }
    }

    /// Take the block number, waiting out any writer that holds it.
    pub async fn claim(&self, block_number: u64) -> Claim {
        loop {
            let mut earlier = {
                let mut claims = self.claims.lock();
                match claims.get(&block_number) {
                    Some(receiver) => receiver.clone(),
                    None => {
                        let (sender, receiver) = watch::channel(None);
                        claims.insert(block_number, receiver);
                        return Claim::Owned(ClaimGuard {
                            block_number,
                            claims: Arc::clone(&self.claims),
                            outcome: sender,
                        });
                    }
                }
            };

            let persisted = match earlier.wait_for(Option::is_some).await {
                Ok(outcome) => matches!(*outcome, Some(status) if status.is_persisted()),
                // Owner dropped without an outcome.
                Err(_) => false,
            };
            if persisted {
                return Claim::AlreadyPersisted;
            }
        }
    }
}

/// Ownership of one block number. Dropping it without
/// [`release`](ClaimGuard::release) lets the next writer take over.
pub struct ClaimGuard {
    block_number: u64,
    claims: Arc<Mutex<HashMap<u64, watch::Receiver<Outcome>>>>,
    outcome: watch::Sender<Outcome>,
}

impl ClaimGuard {
    /// Publish the owner's final status to waiting writers. A persisted
    /// block keeps its claim until [`InFlightBlocks::forget`].
    pub fn release(self, status: BlockPersistenceStatus) {
        let mut claims = self.claims.lock();
        if !status.is_persisted() {
            claims.remove(&self.block_number);
        }
        self.outcome.send_replace(Some(status));
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        // A released claim may already belong to a newer writer.
        if self.outcome.borrow().is_none() {
            self.claims.lock().remove(&self.block_number);
        }
    }
}
