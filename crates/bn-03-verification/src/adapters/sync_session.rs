//! Synchronous strategy: the caller's task hashes every slice inline.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::BlockItem;
use tracing::debug;

use crate::domain::accumulator::{hash_leaves, split_at_proof};
use crate::domain::merkle::root_of;
use crate::domain::result::VerificationResultHandle;
use crate::domain::session::SessionState;
use crate::ports::inbound::VerificationSession;

pub struct SyncVerificationSession {
    block_number: u64,
    state: Mutex<SessionState>,
    handle: VerificationResultHandle,
}

impl SyncVerificationSession {
    pub fn new(state: SessionState, handle: VerificationResultHandle) -> Self {
        Self {
            block_number: state.block_number(),
            state: Mutex::new(state),
            handle,
        }
    }

    fn process(&self, items: &[BlockItem]) {
        let mut state = self.state.lock();
        if state.is_terminated() {
            debug!(block_number = self.block_number, "Session terminated, ignoring items");
            return;
        }

        let (leaves, proof) = split_at_proof(items);
        match hash_leaves(self.block_number, leaves) {
            Ok(hashed) => state.add_leaves(hashed),
            Err(e) => {
                state.complete(Err(e));
                return;
            }
        }

        let Some(proof) = proof else {
            return;
        };
        let outcome = state.open_proof(proof).map(|proof| {
            let input_root = root_of(state.accumulator().input_leaves());
            let output_root = root_of(state.accumulator().output_leaves());
            state.conclude(&proof, input_root, output_root)
        });
        state.complete(outcome);
    }
}

#[async_trait]
impl VerificationSession for SyncVerificationSession {
    fn block_number(&self) -> u64 {
        self.block_number
    }

    async fn append_block_items(&self, items: Vec<BlockItem>) {
        self.process(&items);
    }

    fn result_handle(&self) -> VerificationResultHandle {
        self.handle.clone()
    }

    fn is_terminated(&self) -> bool {
        self.state.lock().is_terminated()
    }
}
