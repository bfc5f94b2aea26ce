//! # Block Merkle Tree
//!
//! A block hash commits to four values: the previous block's root, the input
//! subtree root, the output subtree root and the start-of-block state root.
//!
//! ```text
//!                        block_hash
//!                 ┌──────────┴──────────┐
//!          combine(prev, in)      combine(out, state)
//!           ┌──────┴─────┐          ┌──────┴──────┐
//!      prev_root    input_root  output_root   state_root
//!                   ┌───┴───┐    ┌───┴───┐
//!                  ...     ...  ...     ...    (item leaves)
//! ```
//!
//! ## Subtree Rules
//!
//! - Leaves are padded with `EMPTY_HASH` to the next power of two.
//! - Parent nodes are `sha384(left || right)`.
//! - An empty subtree's root is `EMPTY_HASH`.
//!
//! Inclusion proofs are built from a [`MerkleTreeInfo`] alone and checked by
//! [`verify_inclusion`], a pure function of leaf, path and block hash.

use rayon::prelude::*;
use shared_crypto::{combine, EMPTY_HASH};
use shared_types::{BlockHash, MerkleTreeInfo};

// =============================================================================
// SUBTREE ROOTS
// =============================================================================

fn padded(leaves: &[BlockHash]) -> Vec<BlockHash> {
    let mut level = leaves.to_vec();
    level.resize(leaves.len().next_power_of_two(), EMPTY_HASH);
    level
}

fn next_level(level: &[BlockHash]) -> Vec<BlockHash> {
    level
        .chunks(2)
        .map(|pair| combine(&pair[0], &pair[1]))
        .collect()
}

/// Root of one subtree, computed on the calling thread.
pub fn root_of(leaves: &[BlockHash]) -> BlockHash {
    if leaves.is_empty() {
        return EMPTY_HASH;
    }
    let mut level = padded(leaves);
    while level.len() > 1 {
        level = next_level(&level);
    }
    level[0]
}

/// Root of one subtree, combining each level in parallel batches of
/// `batch_size` nodes on the current rayon pool.
///
/// `batch_size` must be even so no pair straddles two batches; the result is
/// identical to [`root_of`].
pub fn root_of_parallel(leaves: &[BlockHash], batch_size: usize) -> BlockHash {
    debug_assert!(batch_size >= 2 && batch_size % 2 == 0);
    if leaves.is_empty() {
        return EMPTY_HASH;
    }
    let mut level = padded(leaves);
    while level.len() > 1 {
        if level.len() <= batch_size {
            level = next_level(&level);
            continue;
        }
        level = level
            .par_chunks(batch_size)
            .flat_map_iter(next_level)
            .collect();
    }
    level[0]
}

/// `combine(combine(prev, input), combine(output, state))`.
pub fn compute_block_hash(
    previous_block_root_hash: &BlockHash,
    input_root: &BlockHash,
    output_root: &BlockHash,
    start_of_block_state_root_hash: &BlockHash,
) -> BlockHash {
    combine(
        &combine(previous_block_root_hash, input_root),
        &combine(output_root, start_of_block_state_root_hash),
    )
}

// =============================================================================
// INCLUSION PROOFS
// =============================================================================

/// Side of the sibling relative to the running hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SiblingPosition {
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofStep {
    pub sibling: BlockHash,
    pub position: SiblingPosition,
}

/// Path from one item hash up to the block hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleProof {
    pub leaf_hash: BlockHash,
    pub steps: Vec<ProofStep>,
}

/// Sibling path from leaf `index` to the subtree root.
fn subtree_path(leaves: &[BlockHash], index: usize) -> Vec<ProofStep> {
    let mut steps = Vec::new();
    let mut level = padded(leaves);
    let mut index = index;

    while level.len() > 1 {
        let (sibling, position) = if index % 2 == 0 {
            (level[index + 1], SiblingPosition::Right)
        } else {
            (level[index - 1], SiblingPosition::Left)
        };
        steps.push(ProofStep { sibling, position });
        level = next_level(&level);
        index /= 2;
    }
    steps
}

/// Build the inclusion proof of `item_hash`, or `None` if it is not a leaf
/// of this block.
pub fn inclusion_proof(info: &MerkleTreeInfo, item_hash: &BlockHash) -> Option<MerkleProof> {
    let input_root = root_of(&info.input_tree_leaves);
    let output_root = root_of(&info.output_tree_leaves);

    let steps = if let Some(index) = info.input_tree_leaves.iter().position(|h| h == item_hash) {
        let mut steps = subtree_path(&info.input_tree_leaves, index);
        steps.push(ProofStep {
            sibling: info.previous_block_root_hash,
            position: SiblingPosition::Left,
        });
        steps.push(ProofStep {
            sibling: combine(&output_root, &info.start_of_block_state_root_hash),
            position: SiblingPosition::Right,
        });
        steps
    } else {
        let index = info
            .output_tree_leaves
            .iter()
            .position(|h| h == item_hash)?;
        let mut steps = subtree_path(&info.output_tree_leaves, index);
        steps.push(ProofStep {
            sibling: info.start_of_block_state_root_hash,
            position: SiblingPosition::Right,
        });
        steps.push(ProofStep {
            sibling: combine(&info.previous_block_root_hash, &input_root),
            position: SiblingPosition::Left,
        });
        steps
    };

    Some(MerkleProof {
        leaf_hash: *item_hash,
        steps,
    })
}

/// Recompute the block hash from `leaf` and `proof` and compare.
pub fn verify_inclusion(leaf: &BlockHash, proof: &MerkleProof, block_hash: &BlockHash) -> bool {
    if proof.leaf_hash != *leaf {
        return false;
    }
    let computed = proof.steps.iter().fold(*leaf, |current, step| match step.position {
        SiblingPosition::Left => combine(&step.sibling, &current),
        SiblingPosition::Right => combine(&current, &step.sibling),
    });
    computed == *block_hash
}
