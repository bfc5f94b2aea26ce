//! # Persistence Routing Handler
//!
//! Mediator subscriber that routes each item to the writer of its block.
//!
//! A header opens a new writer. If the previous writer never saw its proof,
//! it is told the block ended (`EndOfBlock`) and finishes as
//! `INCOMPLETE_BLOCK`. Items arriving while no block is open (a router that
//! joined mid-block) are dropped.

use async_trait::async_trait;
use std::sync::Arc;

use shared_bus::{EventPayload, HandlerError, HandlerKind, MediatorEvent, SubscriptionHandler};
use shared_types::{AckHandler, BlockItem};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::service::{WriterFactory, WriterHandle};

pub struct PersistenceHandler {
    factory: WriterFactory,
    ack_handler: Arc<dyn AckHandler>,
    current: Mutex<Option<WriterHandle>>,
}

impl PersistenceHandler {
    pub fn new(factory: WriterFactory, ack_handler: Arc<dyn AckHandler>) -> Self {
        Self {
            factory,
            ack_handler,
            current: Mutex::new(None),
        }
    }

    async fn route(&self, item: &BlockItem) {
        let mut current = self.current.lock().await;

        if item.has_block_header() {
            if let Some(previous) = current.take() {
                debug!(
                    block_number = previous.block_number(),
                    "Header arrived before proof, closing previous block"
                );
                previous.end_block().await;
            }

            match item.block_header() {
                Ok(header) => {
                    let writer = self.factory.spawn(header.number);
                    writer.send_item(item.clone()).await;
                    *current = Some(writer);
                }
                Err(e) => {
                    error!(error = %e, "Unparsable block header");
                    let ack_handler = Arc::clone(&self.ack_handler);
                    let reason = format!("persistence: {e}");
                    tokio::spawn(async move { ack_handler.unrecoverable_error(reason).await });
                }
            }
            return;
        }

        let Some(writer) = current.as_ref() else {
            debug!(item = ?item, "No open block, dropping item");
            return;
        };

        if !writer.send_item(item.clone()).await {
            warn!(
                block_number = writer.block_number(),
                "Writer finished early, dropping rest of block"
            );
            *current = None;
            return;
        }

        if item.has_block_proof() {
            *current = None;
        }
    }
}

#[async_trait]
impl SubscriptionHandler for PersistenceHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Persistence
    }

    async fn on_event(&self, event: &MediatorEvent) -> Result<(), HandlerError> {
        if let EventPayload::Item(item) = &event.payload {
            self.route(item).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryBlockStorage;
    use crate::ports::outbound::BlockStorage;
    use bn_telemetry::BlockNodeMetrics;
    use shared_types::{
        BlockHeader, BlockPersistenceResult, BlockPersistenceStatus, BlockProof, ItemKind,
        VerificationResult, ZERO_HASH,
    };
    use std::time::Duration;
    use tokio::sync::{mpsc, watch};

    struct ChannelAckHandler {
        persisted: mpsc::UnboundedSender<BlockPersistenceResult>,
        fatal: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl AckHandler for ChannelAckHandler {
        async fn block_persisted(&self, result: BlockPersistenceResult) {
            let _ = self.persisted.send(result);
        }

        async fn block_verified(&self, _result: VerificationResult) {}

        async fn unrecoverable_error(&self, reason: String) {
            let _ = self.fatal.send(reason);
        }
    }

    struct Fixture {
        handler: PersistenceHandler,
        storage: Arc<InMemoryBlockStorage>,
        persisted: mpsc::UnboundedReceiver<BlockPersistenceResult>,
        fatal: mpsc::UnboundedReceiver<String>,
        _shutdown: watch::Sender<bool>,
        sequence: u64,
    }

    impl Fixture {
        fn new() -> Self {
            let (persisted_tx, persisted) = mpsc::unbounded_channel();
            let (fatal_tx, fatal) = mpsc::unbounded_channel();
            let ack_handler: Arc<dyn AckHandler> = Arc::new(ChannelAckHandler {
                persisted: persisted_tx,
                fatal: fatal_tx,
            });
            let storage = Arc::new(InMemoryBlockStorage::new());
            let (shutdown, shutdown_rx) = watch::channel(false);
            let factory = WriterFactory::new(
                storage.clone(),
                Arc::clone(&ack_handler),
                Arc::new(BlockNodeMetrics::new().unwrap()),
                shutdown_rx,
                8,
            );
            Self {
                handler: PersistenceHandler::new(factory, ack_handler),
                storage,
                persisted,
                fatal,
                _shutdown: shutdown,
                sequence: 0,
            }
        }

        async fn deliver(&mut self, item: BlockItem) {
            self.sequence += 1;
            let event = MediatorEvent {
                sequence: self.sequence,
                payload: EventPayload::Item(item),
            };
            self.handler.on_event(&event).await.unwrap();
        }

        async fn next_result(&mut self) -> BlockPersistenceResult {
            tokio::time::timeout(Duration::from_secs(5), self.persisted.recv())
                .await
                .unwrap()
                .unwrap()
        }
    }

    fn header(number: u64) -> BlockItem {
        BlockItem::header(&BlockHeader::new(number, ZERO_HASH)).unwrap()
    }

    fn body(tag: u8) -> BlockItem {
        BlockItem::other(ItemKind::EventTransaction, vec![tag; 8])
    }

    fn proof(block: u64) -> BlockItem {
        BlockItem::proof(&BlockProof {
            block,
            previous_block_root_hash: ZERO_HASH,
            start_of_block_state_root_hash: ZERO_HASH,
            block_signature: vec![1; 64],
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_block_routed_to_its_writer() {
        let mut f = Fixture::new();
        for item in [header(1), body(1), body(2), proof(1)] {
            f.deliver(item).await;
        }

        let result = f.next_result().await;
        assert_eq!(result.block_number, 1);
        assert_eq!(result.status, BlockPersistenceStatus::Success);
        assert_eq!(
            f.storage.read_block(1).unwrap(),
            Some(vec![header(1), body(1), body(2), proof(1)])
        );
    }

    #[tokio::test]
    async fn test_new_header_closes_unfinished_block() {
        let mut f = Fixture::new();
        for item in [header(2), body(1), header(3), body(2), proof(3)] {
            f.deliver(item).await;
        }

        let mut results = vec![f.next_result().await, f.next_result().await];
        results.sort_by_key(|r| r.block_number);

        assert_eq!(results[0].block_number, 2);
        assert_eq!(results[0].status, BlockPersistenceStatus::IncompleteBlock);
        assert_eq!(results[1].block_number, 3);
        assert_eq!(results[1].status, BlockPersistenceStatus::Success);
        assert_eq!(f.storage.read_block(2).unwrap(), None);
    }

    #[tokio::test]
    async fn test_same_block_twice_is_written_once() {
        let mut f = Fixture::new();
        for _ in 0..2 {
            for item in [header(5), body(1), body(2), proof(5)] {
                f.deliver(item).await;
            }
        }

        let first = f.next_result().await;
        let second = f.next_result().await;
        assert_eq!(first, BlockPersistenceResult::new(5, BlockPersistenceStatus::Success));
        assert_eq!(
            second,
            BlockPersistenceResult::new(5, BlockPersistenceStatus::DuplicateBlock)
        );
        assert_eq!(f.storage.write_count(), 1);
        assert!(f.fatal.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_items_without_open_block_are_dropped() {
        let mut f = Fixture::new();
        f.deliver(body(1)).await;
        f.deliver(proof(9)).await;

        f.deliver(header(4)).await;
        f.deliver(proof(4)).await;

        let result = f.next_result().await;
        assert_eq!(result.block_number, 4);
        assert!(f.persisted.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unparsable_header_is_escalated() {
        let mut f = Fixture::new();
        f.deliver(BlockItem::Header(vec![0xFF])).await;

        let reason = tokio::time::timeout(Duration::from_secs(5), f.fatal.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(reason.starts_with("persistence"));
        assert_eq!(f.storage.write_count(), 0);
    }
}
