//! # Dynamic Subscription Scenarios
//!
//! Consumers joining and leaving while producers keep publishing.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bn_02_persistence::InMemoryBlockStorage;
    use bn_03_verification::SessionType;
    use tokio::time::timeout;

    use crate::fixtures::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_late_consumer_starts_at_next_block() {
        let mut chain = ChainBuilder::new(10);
        let node = start_node(
            test_config(SessionType::Async),
            Arc::new(InMemoryBlockStorage::new()),
            chain.verifier(),
        )
        .await;
        let mut producer = node.open_producer().unwrap();

        let first = chain.block(1, 4);
        publish_block(&producer, &first).await;
        next_ack(&mut producer).await;

        let mut late = node.open_consumer(Some(2)).await.unwrap();
        let second = chain.block(2, 4);
        publish_block(&producer, &second).await;

        assert_eq!(receive_items(&mut late, second.items.len()).await, second.items);
        assert_eq!(next_ack(&mut producer).await.block_number, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_consumer_joining_mid_block_waits_for_next_header() {
        let mut chain = ChainBuilder::new(11);
        let node = start_node(
            test_config(SessionType::Sync),
            Arc::new(InMemoryBlockStorage::new()),
            chain.verifier(),
        )
        .await;
        let producer = node.open_producer().unwrap();
        let first = chain.block(1, 6);
        let second = chain.block(2, 3);

        producer.publish_batch(first.items[..3].to_vec()).await.unwrap();
        let mut consumer = node.open_consumer(None).await.unwrap();
        producer.publish_batch(first.items[3..].to_vec()).await.unwrap();
        publish_block(&producer, &second).await;

        let received = receive_items(&mut consumer, second.items.len()).await;
        assert_eq!(received, second.items);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_unsubscribing_mid_block_leaves_others_untouched() {
        let mut chain = ChainBuilder::new(12);
        let node = start_node(
            test_config(SessionType::Async),
            Arc::new(InMemoryBlockStorage::new()),
            chain.verifier(),
        )
        .await;
        let mut producer = node.open_producer().unwrap();
        let mut leaving = node.open_consumer(None).await.unwrap();
        let mut staying = node.open_consumer(None).await.unwrap();
        let block = chain.block(1, 8);
        let (head, tail) = block.items.split_at(4);

        producer.publish_batch(head.to_vec()).await.unwrap();
        assert_eq!(receive_items(&mut leaving, head.len()).await, head);

        assert!(node.mediator().unsubscribe(leaving.id()).await);
        producer.publish_batch(tail.to_vec()).await.unwrap();

        assert_eq!(
            timeout(WAIT, leaving.recv()).await.unwrap(),
            None,
            "unsubscribed consumer must not see the rest of the block"
        );
        assert_eq!(receive_items(&mut staying, block.items.len()).await, block.items);
        assert_eq!(next_ack(&mut producer).await.block_number, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_consumers_see_one_order_across_producers() {
        let mut chain = ChainBuilder::new(13);
        let node = start_node(
            test_config(SessionType::Sync),
            Arc::new(InMemoryBlockStorage::new()),
            chain.verifier(),
        )
        .await;
        let mut first_view = node.open_consumer(None).await.unwrap();
        let mut second_view = node.open_consumer(None).await.unwrap();
        let blocks: Vec<TestBlock> = (1..=4).map(|n| chain.block(n, 3)).collect();

        let producers = (node.open_producer().unwrap(), node.open_producer().unwrap());
        let (left, right) = blocks.split_at(2);
        tokio::join!(
            async {
                for block in left {
                    producers.0.publish_batch(block.items.clone()).await.unwrap();
                }
            },
            async {
                for block in right {
                    producers.1.publish_batch(block.items.clone()).await.unwrap();
                }
            }
        );

        let total: usize = blocks.iter().map(|b| b.items.len()).sum();
        let seen_first = receive_items(&mut first_view, total).await;
        let seen_second = receive_items(&mut second_view, total).await;
        assert_eq!(seen_first, seen_second);
        for block in &blocks {
            let start = seen_first
                .iter()
                .position(|item| item == block.header())
                .unwrap();
            assert_eq!(&seen_first[start..start + block.items.len()], block.items.as_slice());
        }
    }
}
