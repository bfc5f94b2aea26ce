//! # Failure Scenarios
//!
//! A failed block stops the node once: producers and consumers get one
//! end-of-stream notice, the listener stops and new streams are refused.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bn_02_persistence::{BlockStorage, InMemoryBlockStorage};
    use bn_03_verification::SessionType;
    use node_runtime::NodeError;
    use shared_types::{EndOfStreamCode, SubscribeResponse, SubscribeStreamStatus};
    use tokio::time::timeout;

    use crate::fixtures::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_bad_signature_ends_every_stream() {
        let chain = ChainBuilder::new(20);
        let node = start_node(
            test_config(SessionType::Async),
            Arc::new(InMemoryBlockStorage::new()),
            chain.verifier(),
        )
        .await;
        let mut producer = node.open_producer().unwrap();
        let mut consumer = node.open_consumer(None).await.unwrap();
        let forged = chain.forged_block(1, 5);

        publish_block(&producer, &forged).await;

        let notice = next_end_of_stream(&mut producer).await;
        assert_eq!(notice.code, EndOfStreamCode::StreamItemsBadStateProof);
        assert_eq!(notice.block_number, None);

        // Items already published still reach the consumer, then the notice.
        assert_eq!(receive_items(&mut consumer, forged.items.len()).await, forged.items);
        assert_eq!(
            timeout(WAIT, consumer.recv()).await.unwrap(),
            Some(SubscribeResponse::Status(
                SubscribeStreamStatus::ReadStreamEndOfStream(
                    EndOfStreamCode::StreamItemsBadStateProof
                )
            ))
        );
        assert_eq!(timeout(WAIT, consumer.recv()).await.unwrap(), None);

        timeout(WAIT, node.stopped()).await.unwrap();
        assert!(!node.service_status().is_running());
        assert!(node.coordinator().is_failed());
        assert!(matches!(
            producer.publish(forged.header().clone()).await,
            Err(NodeError::NotAvailable)
        ));
        assert!(matches!(node.open_producer(), Err(NodeError::NotAvailable)));
        assert!(matches!(
            node.open_consumer(None).await,
            Err(NodeError::NotAvailable)
        ));
        assert_eq!(node.metrics().acked_blocks.get(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_write_failure_ends_streams_without_artifacts() {
        let mut chain = ChainBuilder::new(21);
        let storage = Arc::new(InMemoryBlockStorage::new());
        storage.set_fail_writes(true);
        let node = start_node(test_config(SessionType::Sync), storage.clone(), chain.verifier()).await;
        let mut producer = node.open_producer().unwrap();

        publish_block(&producer, &chain.block(1, 4)).await;

        let notice = next_end_of_stream(&mut producer).await;
        assert_eq!(notice.code, EndOfStreamCode::StreamItemsPersistenceFailed);
        timeout(WAIT, node.stopped()).await.unwrap();
        assert!(node.is_shutdown());

        assert_eq!(storage.read_block(1).unwrap(), None);
        assert!(!storage.exists_unverified(1).unwrap());
        assert!(!storage.exists_verified(1).unwrap());
        assert_eq!(node.metrics().block_persistence_errors.get(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failure_reports_last_acknowledged_block() {
        let mut chain = ChainBuilder::new(22);
        let node = start_node(
            test_config(SessionType::Async),
            Arc::new(InMemoryBlockStorage::new()),
            chain.verifier(),
        )
        .await;
        let mut producer = node.open_producer().unwrap();

        let first = chain.block(1, 3);
        publish_block(&producer, &first).await;
        assert_eq!(next_ack(&mut producer).await.block_hash, first.hash);

        publish_block(&producer, &chain.forged_block(2, 3)).await;
        let notice = next_end_of_stream(&mut producer).await;
        assert_eq!(notice.code, EndOfStreamCode::StreamItemsBadStateProof);
        assert_eq!(notice.block_number, Some(1));

        // One notice only, however many results are still in flight.
        assert_no_response(&mut producer).await;
        assert_eq!(node.next_block_number(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failure_interrupts_later_writers() {
        let mut chain = ChainBuilder::new(24);
        let storage = Arc::new(InMemoryBlockStorage::new());
        let node = start_node(test_config(SessionType::Sync), storage.clone(), chain.verifier()).await;
        let mut producer = node.open_producer().unwrap();

        // Block 2 is still waiting for its proof when block 1 fails.
        let forged = chain.forged_block(1, 2);
        let next = chain.block(2, 4);
        let mut items = forged.items.clone();
        items.extend_from_slice(&next.items[..next.items.len() - 1]);
        producer.publish_batch(items).await.unwrap();

        next_end_of_stream(&mut producer).await;
        assert!(node.is_shutdown());
        let metrics = Arc::clone(node.metrics());
        wait_until(|| metrics.block_persistence_errors.get() >= 1).await;
        assert!(!storage.exists_unverified(2).unwrap());
        assert!(!storage.exists_verified(2).unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_producer_gets_the_notice() {
        let chain = ChainBuilder::new(23);
        let node = start_node(
            test_config(SessionType::Sync),
            Arc::new(InMemoryBlockStorage::new()),
            chain.verifier(),
        )
        .await;
        let mut publishing = node.open_producer().unwrap();
        let mut watching = node.open_producer().unwrap();

        publish_block(&publishing, &chain.forged_block(1, 2)).await;

        for producer in [&mut publishing, &mut watching] {
            let notice = next_end_of_stream(producer).await;
            assert_eq!(notice.code, EndOfStreamCode::StreamItemsBadStateProof);
        }
    }
}
