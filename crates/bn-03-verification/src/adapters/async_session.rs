//! # Asynchronous Strategy
//!
//! Appends only enqueue. A per-session worker task drains the queue into
//! batches of `batch_size` items and offloads hashing and root computation
//! to the shared rayon pool:
//!
//! ```text
//! append ──► [mpsc] ──► worker ──► pool: hash batch (par_iter)
//!                         │   ◄── leaves (in order)
//!                         └─ proof ──► pool: subtree roots (par_chunks)
//!                                  ◄── roots ──► conclude ──► resolve
//! ```
//!
//! The worker stops on shutdown (resolving `Interrupted`), on termination,
//! or when the session is dropped.

use std::ops::ControlFlow;
use std::sync::Arc;

use async_trait::async_trait;
use rayon::ThreadPool;
use shared_types::BlockItem;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::domain::accumulator::{hash_leaves_parallel, split_at_proof};
use crate::domain::errors::VerificationError;
use crate::domain::merkle::root_of_parallel;
use crate::domain::result::VerificationResultHandle;
use crate::domain::session::SessionState;
use crate::ports::inbound::VerificationSession;

/// Run `job` on `pool` and await its result without blocking the runtime.
async fn on_pool<T, F>(pool: &ThreadPool, job: F) -> Result<T, VerificationError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    pool.spawn(move || {
        let _ = sender.send(job());
    });
    receiver
        .await
        .map_err(|_| VerificationError::Pool("hashing job dropped".to_string()))
}

pub struct AsyncVerificationSession {
    block_number: u64,
    sender: mpsc::Sender<Vec<BlockItem>>,
    handle: VerificationResultHandle,
}

impl AsyncVerificationSession {
    /// Start the session's worker on the current runtime.
    pub fn spawn(
        state: SessionState,
        handle: VerificationResultHandle,
        pool: Arc<ThreadPool>,
        batch_size: usize,
        queue_capacity: usize,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let block_number = state.block_number();
        let (sender, queue) = mpsc::channel(queue_capacity.max(1));
        let worker = Worker {
            state,
            queue,
            pool,
            batch_size: batch_size.max(2),
            shutdown,
        };
        tokio::spawn(worker.run());
        Self {
            block_number,
            sender,
            handle,
        }
    }
}

#[async_trait]
impl VerificationSession for AsyncVerificationSession {
    fn block_number(&self) -> u64 {
        self.block_number
    }

    async fn append_block_items(&self, items: Vec<BlockItem>) {
        if items.is_empty() || self.is_terminated() {
            return;
        }
        if self.sender.send(items).await.is_err() {
            debug!(block_number = self.block_number, "Session worker gone, ignoring items");
        }
    }

    fn result_handle(&self) -> VerificationResultHandle {
        self.handle.clone()
    }

    fn is_terminated(&self) -> bool {
        self.handle.try_outcome().is_some()
    }
}

struct Worker {
    state: SessionState,
    queue: mpsc::Receiver<Vec<BlockItem>>,
    pool: Arc<ThreadPool>,
    batch_size: usize,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    async fn run(mut self) {
        let block_number = self.state.block_number();
        loop {
            let items = tokio::select! {
                biased;
                _ = self.shutdown.wait_for(|stop| *stop) => {
                    self.state.complete(Err(VerificationError::Interrupted(block_number)));
                    break;
                }
                next = self.queue.recv() => match next {
                    Some(items) => items,
                    None => {
                        debug!(block_number, "Session dropped before its proof");
                        break;
                    }
                },
            };

            let batch = self.fill_batch(items);
            if self.process(batch).await.is_break() {
                break;
            }
        }
    }

    /// Top a batch up from already queued slices, stopping at a proof.
    fn fill_batch(&mut self, mut batch: Vec<BlockItem>) -> Vec<BlockItem> {
        while batch.len() < self.batch_size && !batch.iter().any(BlockItem::has_block_proof) {
            match self.queue.try_recv() {
                Ok(more) => batch.extend(more),
                Err(_) => break,
            }
        }
        batch
    }

    fn interrupted(&self) -> bool {
        *self.shutdown.borrow()
    }

    async fn process(&mut self, items: Vec<BlockItem>) -> ControlFlow<()> {
        if self.state.is_terminated() {
            return ControlFlow::Break(());
        }
        let block_number = self.state.block_number();
        let (leaves, proof) = split_at_proof(&items);
        let proof = proof.cloned();

        for chunk in leaves.chunks(self.batch_size) {
            if self.interrupted() {
                self.state
                    .complete(Err(VerificationError::Interrupted(block_number)));
                return ControlFlow::Break(());
            }
            let chunk = chunk.to_vec();
            let hashed = on_pool(&self.pool, move || hash_leaves_parallel(block_number, &chunk))
                .await
                .and_then(|result| result);
            match hashed {
                Ok(hashed) => self.state.add_leaves(hashed),
                Err(e) => {
                    self.state.complete(Err(e));
                    return ControlFlow::Break(());
                }
            }
        }

        let Some(proof_item) = proof else {
            return ControlFlow::Continue(());
        };
        let outcome = match self.state.open_proof(&proof_item) {
            Ok(proof) => {
                let input = self.state.accumulator().input_leaves().to_vec();
                let output = self.state.accumulator().output_leaves().to_vec();
                let batch_size = self.batch_size;
                on_pool(&self.pool, move || {
                    (
                        root_of_parallel(&input, batch_size),
                        root_of_parallel(&output, batch_size),
                    )
                })
                .await
                .map(|(input_root, output_root)| {
                    self.state.conclude(&proof, input_root, output_root)
                })
            }
            Err(e) => Err(e),
        };
        self.state.complete(outcome);
        ControlFlow::Break(())
    }
}
