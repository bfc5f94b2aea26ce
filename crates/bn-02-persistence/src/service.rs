//! # Writer Factory
//!
//! Spawns one [`AsyncBlockWriter`] per block on the tokio runtime and hands
//! back the sending side of its queue.

use std::sync::Arc;

use bn_telemetry::BlockNodeMetrics;
use shared_types::{AckHandler, BlockItem, BlockPersistenceResult};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::domain::in_flight::InFlightBlocks;
use crate::domain::writer::{AsyncBlockWriter, WriterMessage};
use crate::ports::outbound::BlockStorage;

/// Default capacity of a writer's item queue.
pub const DEFAULT_WRITER_QUEUE_CAPACITY: usize = 256;

/// Everything a writer needs, shared by all writers of one node.
#[derive(Clone)]
pub struct WriterFactory {
    storage: Arc<dyn BlockStorage>,
    ack_handler: Arc<dyn AckHandler>,
    metrics: Arc<BlockNodeMetrics>,
    shutdown: watch::Receiver<bool>,
    in_flight: InFlightBlocks,
    queue_capacity: usize,
}

impl WriterFactory {
    pub fn new(
        storage: Arc<dyn BlockStorage>,
        ack_handler: Arc<dyn AckHandler>,
        metrics: Arc<BlockNodeMetrics>,
        shutdown: watch::Receiver<bool>,
        queue_capacity: usize,
    ) -> Self {
        Self {
            storage,
            ack_handler,
            metrics,
            shutdown,
            in_flight: InFlightBlocks::new(),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Share block claims with whatever finalizes the artifacts.
    pub fn with_in_flight(mut self, in_flight: InFlightBlocks) -> Self {
        self.in_flight = in_flight;
        self
    }

    pub fn storage(&self) -> &Arc<dyn BlockStorage> {
        &self.storage
    }

    /// Claims shared by every writer this factory spawns.
    pub fn in_flight(&self) -> &InFlightBlocks {
        &self.in_flight
    }

    /// Start a writer for `block_number`.
    pub fn spawn(&self, block_number: u64) -> WriterHandle {
        let (sender, queue) = mpsc::channel(self.queue_capacity);
        let writer = AsyncBlockWriter::new(
            block_number,
            queue,
            Arc::clone(&self.storage),
            Arc::clone(&self.ack_handler),
            Arc::clone(&self.metrics),
            self.shutdown.clone(),
            self.in_flight.clone(),
        );
        debug!(block_number, "Writer started");
        WriterHandle {
            block_number,
            sender,
            task: tokio::spawn(writer.run()),
        }
    }
}

/// Sending side of a running writer.
pub struct WriterHandle {
    block_number: u64,
    sender: mpsc::Sender<WriterMessage>,
    task: JoinHandle<BlockPersistenceResult>,
}

impl WriterHandle {
    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    /// Queue an item. `false` if the writer has already finished.
    pub async fn send_item(&self, item: BlockItem) -> bool {
        self.sender.send(WriterMessage::Item(item)).await.is_ok()
    }

    /// Tell the writer its block ended without a proof.
    pub async fn end_block(&self) -> bool {
        self.sender.send(WriterMessage::EndOfBlock).await.is_ok()
    }

    /// Close the queue and wait for the writer's result.
    ///
    /// A writer still awaiting items ends as interrupted. `None` if its task
    /// panicked.
    pub async fn join(self) -> Option<BlockPersistenceResult> {
        drop(self.sender);
        self.task.await.ok()
    }
}
