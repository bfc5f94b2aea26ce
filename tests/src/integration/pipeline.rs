//! # Pipeline Scenarios
//!
//! Publish → persist + verify → acknowledge, observed from the producer,
//! the consumers and storage.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bn_02_persistence::{BlockStorage, CompressionKind, FileBlockStorage, InMemoryBlockStorage};
    use bn_03_verification::SessionType;
    use shared_types::{BlockItem, PublishResponse};

    use crate::fixtures::*;

    // =========================================================================
    // The ten-item block
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_ten_item_block_reaches_three_consumers_and_is_acked_once() {
        let mut chain = ChainBuilder::new(1);
        let storage = Arc::new(InMemoryBlockStorage::new());
        let node = start_node(
            test_config(SessionType::Async),
            storage.clone(),
            chain.verifier(),
        )
        .await;

        let mut consumers = Vec::new();
        for _ in 0..3 {
            consumers.push(node.open_consumer(None).await.unwrap());
        }
        let mut producer = node.open_producer().unwrap();

        let block = chain.block(1, 8);
        assert_eq!(block.items.len(), 10);
        publish_block(&producer, &block).await;

        for consumer in &mut consumers {
            let received = receive_items(consumer, 10).await;
            assert_eq!(received, block.items);
            assert!(received[0].has_block_header());
            assert!(received[9].has_block_proof());
        }

        let ack = next_ack(&mut producer).await;
        assert_eq!(ack.block_number, 1);
        assert_eq!(ack.block_hash, block.hash);
        assert!(!ack.block_already_exists);
        assert_no_response(&mut producer).await;

        assert_eq!(storage.read_block(1).unwrap(), Some(block.items.clone()));
        assert!(storage.exists_verified(1).unwrap());
        assert!(!storage.exists_unverified(1).unwrap());

        let metrics = Arc::clone(node.metrics());
        assert_eq!(metrics.blocks_persisted.get(), 1);
        assert_eq!(metrics.acked_blocks.get(), 1);
        assert_eq!(metrics.items_published.get(), 10);
        wait_until(|| metrics.verification_blocks_verified.get() == 1).await;
        wait_until(|| metrics.live_block_items_consumed.get() == 30).await;
        assert_eq!(
            node.service_status().latest_acked_block().map(|b| b.block_hash),
            Some(block.hash)
        );
    }

    #[tokio::test]
    async fn test_ack_serializes_for_transport() {
        let mut chain = ChainBuilder::new(2);
        let node = start_node(
            test_config(SessionType::Sync),
            Arc::new(InMemoryBlockStorage::new()),
            chain.verifier(),
        )
        .await;
        let mut producer = node.open_producer().unwrap();

        publish_block(&producer, &chain.block(1, 3)).await;
        let response = next_response(&mut producer).await;

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["Acknowledgement"]["block_number"], 1);
        assert_eq!(json["Acknowledgement"]["block_already_exists"], false);
        assert!(matches!(response, PublishResponse::Acknowledgement(_)));
    }

    // =========================================================================
    // Exactly-once persistence
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_duplicate_block_is_stored_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(SessionType::Async);
        config.persistence.root_path = dir.path().to_path_buf();
        config.persistence.compression = CompressionKind::Zstd;
        let storage = Arc::new(FileBlockStorage::new(
            dir.path(),
            config.persistence.compression_config(),
        ));

        let mut chain = ChainBuilder::new(3);
        let node = start_node(config, storage.clone(), chain.verifier()).await;
        let mut producer = node.open_producer().unwrap();
        let block = chain.block(1, 6);

        publish_block(&producer, &block).await;
        assert_eq!(next_ack(&mut producer).await.block_number, 1);

        publish_block(&producer, &block).await;
        let metrics = Arc::clone(node.metrics());
        wait_until(|| metrics.blocks_persisted.get() == 2).await;
        wait_until(|| metrics.verification_blocks_verified.get() == 2).await;

        // The second copy is absorbed: no second ack, no second artifact.
        assert_no_response(&mut producer).await;
        assert_eq!(count_files(dir.path()), 1);
        assert!(storage.exists_verified(1).unwrap());
        assert!(!storage.exists_unverified(1).unwrap());
        assert_eq!(storage.read_block(1).unwrap(), Some(block.items));
        assert_eq!(metrics.acked_blocks.get(), 1);
        assert!(node.service_status().is_running());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_back_to_back_copies_are_acked_once() {
        let mut chain = ChainBuilder::new(7);
        let storage = Arc::new(InMemoryBlockStorage::new());
        let node = start_node(test_config(SessionType::Async), storage.clone(), chain.verifier()).await;
        let mut producer = node.open_producer().unwrap();
        let block = chain.block(1, 6);

        // Two redundant producers racing with the same block.
        publish_block(&producer, &block).await;
        publish_block(&producer, &block).await;

        let ack = next_ack(&mut producer).await;
        assert_eq!(ack.block_number, 1);
        assert_eq!(ack.block_hash, block.hash);
        assert!(!ack.block_already_exists);

        let metrics = Arc::clone(node.metrics());
        wait_until(|| metrics.blocks_persisted.get() == 2).await;
        assert_no_response(&mut producer).await;
        assert_eq!(storage.write_count(), 1);
        assert!(storage.exists_verified(1).unwrap());
        assert!(!storage.exists_unverified(1).unwrap());
        assert_eq!(metrics.block_persistence_errors.get(), 0);
        assert!(node.service_status().is_running());

        publish_block(&producer, &chain.block(2, 2)).await;
        assert_eq!(next_ack(&mut producer).await.block_number, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_back_to_back_copies_on_disk_leave_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(SessionType::Sync);
        config.persistence.root_path = dir.path().to_path_buf();
        let storage = Arc::new(FileBlockStorage::new(
            dir.path(),
            config.persistence.compression_config(),
        ));
        let mut chain = ChainBuilder::new(8);
        let node = start_node(config, storage.clone(), chain.verifier()).await;
        let mut producer = node.open_producer().unwrap();
        let block = chain.block(1, 4);

        for _ in 0..3 {
            publish_block(&producer, &block).await;
        }

        assert_eq!(next_ack(&mut producer).await.block_number, 1);
        let metrics = Arc::clone(node.metrics());
        wait_until(|| metrics.blocks_persisted.get() == 3).await;
        assert_no_response(&mut producer).await;
        assert_eq!(count_files(dir.path()), 1);
        assert_eq!(storage.read_block(1).unwrap(), Some(block.items));
        assert!(node.service_status().is_running());
    }

    #[tokio::test]
    async fn test_block_already_in_storage_is_acked_as_existing() {
        let mut chain = ChainBuilder::new(4);
        let block = chain.block(1, 4);
        let storage = Arc::new(InMemoryBlockStorage::new());
        storage.insert_verified(1, block.items.clone());

        let node = start_node(test_config(SessionType::Sync), storage.clone(), chain.verifier()).await;
        let mut producer = node.open_producer().unwrap();
        publish_block(&producer, &block).await;

        let ack = next_ack(&mut producer).await;
        assert_eq!(ack.block_number, 1);
        assert!(ack.block_already_exists);
        assert_eq!(storage.write_count(), 0);
    }

    // =========================================================================
    // Finality ordering
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_later_block_waits_for_earlier_one() {
        let mut chain = ChainBuilder::new(5);
        let first = chain.block(1, 5);
        let second = chain.block(2, 5);
        let node = start_node(
            test_config(SessionType::Async),
            Arc::new(InMemoryBlockStorage::new()),
            chain.verifier(),
        )
        .await;
        let mut producer = node.open_producer().unwrap();

        publish_block(&producer, &second).await;
        let metrics = Arc::clone(node.metrics());
        wait_until(|| metrics.blocks_persisted.get() == 1).await;
        wait_until(|| metrics.verification_blocks_verified.get() == 1).await;
        assert_no_response(&mut producer).await;
        assert_eq!(node.service_status().latest_acked_block(), None);

        publish_block(&producer, &first).await;
        let acks = [next_ack(&mut producer).await, next_ack(&mut producer).await];
        let numbers: Vec<u64> = acks.iter().map(|a| a.block_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(acks[1].block_hash, second.hash);
        assert_eq!(node.next_block_number(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_incomplete_block_is_not_acked_until_resent() {
        let mut chain = ChainBuilder::new(6);
        let first = chain.block(1, 4);
        let second = chain.block(2, 4);
        let storage = Arc::new(InMemoryBlockStorage::new());
        let node = start_node(test_config(SessionType::Sync), storage.clone(), chain.verifier()).await;
        let mut producer = node.open_producer().unwrap();

        // Block 1 without its proof, then block 2 in full.
        let truncated: Vec<BlockItem> = first.items[..first.items.len() - 1].to_vec();
        producer.publish_batch(truncated).await.unwrap();
        publish_block(&producer, &second).await;

        let metrics = Arc::clone(node.metrics());
        wait_until(|| metrics.block_persistence_errors.get() == 1).await;
        assert_no_response(&mut producer).await;
        assert!(!storage.exists_unverified(1).unwrap());

        publish_block(&producer, &first).await;
        let acks = [next_ack(&mut producer).await, next_ack(&mut producer).await];
        let numbers: Vec<u64> = acks.iter().map(|a| a.block_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert!(node.service_status().is_running());
    }
}
