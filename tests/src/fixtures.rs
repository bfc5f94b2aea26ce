//! # Test Fixtures
//!
//! Signed block construction, node start-up and bounded waits shared by the
//! integration scenarios.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bn_02_persistence::BlockStorage;
use bn_03_verification::domain::{hash_leaves, BlockAccumulator};
use bn_03_verification::{compute_block_hash, root_of, SessionType};
use node_runtime::{BlockNode, ConsumerSession, NodeConfig, ProducerSession};
use shared_crypto::{sha384_hash, Ed25519KeyPair, Ed25519SignatureVerifier, SignatureVerifier};
use shared_types::{
    Acknowledgement, BlockHash, BlockHeader, BlockItem, BlockProof, EndOfStream, ItemKind,
    MerkleTreeInfo, PublishResponse, SubscribeResponse, ZERO_HASH,
};
use tokio::time::timeout;

/// Upper bound for any single wait in a scenario.
pub const WAIT: Duration = Duration::from_secs(10);

/// How long "nothing else arrives" is observed for.
pub const QUIET: Duration = Duration::from_millis(200);

const BODY_KINDS: [ItemKind; 6] = [
    ItemKind::EventHeader,
    ItemKind::RoundHeader,
    ItemKind::EventTransaction,
    ItemKind::TransactionResult,
    ItemKind::TransactionOutput,
    ItemKind::StateChanges,
];

/// A complete block and everything needed to check it.
#[derive(Clone, Debug)]
pub struct TestBlock {
    pub number: u64,
    /// Header, body, proof.
    pub items: Vec<BlockItem>,
    pub hash: BlockHash,
    pub tree: MerkleTreeInfo,
}

impl TestBlock {
    pub fn header(&self) -> &BlockItem {
        &self.items[0]
    }

    pub fn proof(&self) -> &BlockItem {
        &self.items[self.items.len() - 1]
    }
}

/// Builds a chain of blocks signed by one producer key.
pub struct ChainBuilder {
    key: Ed25519KeyPair,
    previous: BlockHash,
}

impl ChainBuilder {
    pub fn new(seed: u8) -> Self {
        Self {
            key: Ed25519KeyPair::from_seed([seed; 32]),
            previous: ZERO_HASH,
        }
    }

    /// A verifier trusting this builder's key.
    pub fn verifier(&self) -> Arc<dyn SignatureVerifier> {
        Arc::new(Ed25519SignatureVerifier::new(self.key.public_key()))
    }

    /// Next block of the chain with `body_len` body items.
    pub fn block(&mut self, number: u64, body_len: usize) -> TestBlock {
        let block = build_block(number, self.previous, body_len, &self.key);
        self.previous = block.hash;
        block
    }

    /// A block signed by a different key. Does not advance the chain.
    pub fn forged_block(&self, number: u64, body_len: usize) -> TestBlock {
        let intruder = Ed25519KeyPair::from_seed([0xEE; 32]);
        build_block(number, self.previous, body_len, &intruder)
    }
}

fn build_block(
    number: u64,
    previous: BlockHash,
    body_len: usize,
    key: &Ed25519KeyPair,
) -> TestBlock {
    let mut items = vec![BlockItem::header(&BlockHeader::new(number, previous)).unwrap()];
    items.extend((0..body_len).map(|i| {
        let kind = BODY_KINDS[i % BODY_KINDS.len()];
        let payload: Vec<u8> = format!("block-{number}-item-{i}").into_bytes();
        BlockItem::other(kind, payload)
    }));

    let state_root = sha384_hash(format!("state-{number}").as_bytes());
    let mut accumulator = BlockAccumulator::default();
    accumulator.extend(hash_leaves(number, &items).unwrap());
    let hash = compute_block_hash(
        &previous,
        &root_of(accumulator.input_leaves()),
        &root_of(accumulator.output_leaves()),
        &state_root,
    );

    items.push(
        BlockItem::proof(&BlockProof {
            block: number,
            previous_block_root_hash: previous,
            start_of_block_state_root_hash: state_root,
            block_signature: key.sign(&hash).as_bytes().to_vec(),
        })
        .unwrap(),
    );

    TestBlock {
        number,
        items,
        hash,
        tree: MerkleTreeInfo {
            input_tree_leaves: accumulator.input_leaves().to_vec(),
            output_tree_leaves: accumulator.output_leaves().to_vec(),
            previous_block_root_hash: previous,
            start_of_block_state_root_hash: state_root,
            block_hash: hash,
        },
    }
}

/// Small, fast node settings.
pub fn test_config(session_type: SessionType) -> NodeConfig {
    let mut config = NodeConfig::default();
    config.verification.session_type = session_type;
    config.verification.hash_combine_batch_size = 4;
    config.verification.worker_threads = 2;
    config.service.shutdown_delay = Duration::from_millis(50);
    config.consumer.timeout_threshold = Duration::from_secs(5);
    config
}

pub async fn start_node(
    config: NodeConfig,
    storage: Arc<dyn BlockStorage>,
    verifier: Arc<dyn SignatureVerifier>,
) -> BlockNode {
    BlockNode::start_with(config, storage, verifier)
        .await
        .unwrap()
}

pub async fn publish_block(producer: &ProducerSession, block: &TestBlock) {
    for item in &block.items {
        producer.publish(item.clone()).await.unwrap();
    }
}

/// Next producer response, failing the test if none arrives in time.
pub async fn next_response(producer: &mut ProducerSession) -> PublishResponse {
    timeout(WAIT, producer.next_response())
        .await
        .expect("no producer response in time")
        .expect("producer response stream closed")
}

pub async fn next_ack(producer: &mut ProducerSession) -> Acknowledgement {
    match next_response(producer).await {
        PublishResponse::Acknowledgement(ack) => ack,
        PublishResponse::EndOfStream(notice) => panic!("expected an ack, got {notice:?}"),
    }
}

pub async fn next_end_of_stream(producer: &mut ProducerSession) -> EndOfStream {
    match next_response(producer).await {
        PublishResponse::EndOfStream(notice) => notice,
        PublishResponse::Acknowledgement(ack) => panic!("expected end of stream, got {ack:?}"),
    }
}

/// Asserts the producer receives nothing for a short while.
pub async fn assert_no_response(producer: &mut ProducerSession) {
    if let Ok(response) = timeout(QUIET, producer.next_response()).await {
        panic!("unexpected producer response {response:?}");
    }
}

/// Receive exactly `count` items from a consumer.
pub async fn receive_items(consumer: &mut ConsumerSession, count: usize) -> Vec<BlockItem> {
    let mut items = Vec::with_capacity(count);
    while items.len() < count {
        match timeout(WAIT, consumer.recv()).await.expect("consumer stalled") {
            Some(SubscribeResponse::Item(item)) => items.push(item),
            other => panic!("expected an item, got {other:?}"),
        }
    }
    items
}

/// Poll `condition` until it holds or [`WAIT`] elapses.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Number of regular files below `root`.
pub fn count_files(root: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(root) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}
