//! # Verification Scenarios
//!
//! Both session types must agree on the block hash, and every leaf of an
//! acknowledged block must prove its inclusion against that hash.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bn_02_persistence::InMemoryBlockStorage;
    use bn_03_verification::{inclusion_proof, verify_inclusion, SessionType};
    use shared_crypto::sha384_hash;
    use shared_types::BlockHash;

    use crate::fixtures::*;

    async fn acked_hash(
        session_type: SessionType,
        block: &TestBlock,
        chain: &ChainBuilder,
    ) -> BlockHash {
        let node = start_node(
            test_config(session_type),
            Arc::new(InMemoryBlockStorage::new()),
            chain.verifier(),
        )
        .await;
        let mut producer = node.open_producer().unwrap();
        publish_block(&producer, block).await;
        let ack = next_ack(&mut producer).await;
        assert_eq!(ack.block_number, block.number);
        ack.block_hash
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sync_and_async_sessions_agree() {
        let mut chain = ChainBuilder::new(30);
        let block = chain.block(1, 100);

        let sync_hash = acked_hash(SessionType::Sync, &block, &chain).await;
        let async_hash = acked_hash(SessionType::Async, &block, &chain).await;

        assert_eq!(sync_hash, block.hash);
        assert_eq!(async_hash, block.hash);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_leaf_proves_inclusion_in_acked_block() {
        let mut chain = ChainBuilder::new(31);
        let block = chain.block(1, 37);
        let acked = acked_hash(SessionType::Async, &block, &chain).await;

        let leaves = block
            .tree
            .input_tree_leaves
            .iter()
            .chain(&block.tree.output_tree_leaves);
        let mut checked = 0;
        for leaf in leaves {
            let proof = inclusion_proof(&block.tree, leaf).unwrap();
            assert!(verify_inclusion(leaf, &proof, &acked));
            checked += 1;
        }
        // Header and body; the proof is not a leaf.
        assert_eq!(checked, block.items.len() - 1);

        let stranger = sha384_hash(b"not in this block");
        assert!(inclusion_proof(&block.tree, &stranger).is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_broken_chain_link_is_counted_not_fatal() {
        let mut chain = ChainBuilder::new(32);
        let mut detached = ChainBuilder::new(32);
        let node = start_node(
            test_config(SessionType::Sync),
            Arc::new(InMemoryBlockStorage::new()),
            chain.verifier(),
        )
        .await;
        let mut producer = node.open_producer().unwrap();

        publish_block(&producer, &chain.block(1, 3)).await;
        next_ack(&mut producer).await;

        // Same signer, but the header links to the zero hash.
        let unlinked = detached.block(2, 3);
        publish_block(&producer, &unlinked).await;

        let ack = next_ack(&mut producer).await;
        assert_eq!(ack.block_number, 2);
        assert_eq!(ack.block_hash, unlinked.hash);
        assert_eq!(node.metrics().previous_hash_mismatches.get(), 1);
        assert!(node.service_status().is_running());
    }
}
