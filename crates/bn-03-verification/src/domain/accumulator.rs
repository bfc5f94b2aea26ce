//! Running leaf accumulator of one block.

use rayon::prelude::*;
use shared_crypto::sha384_hash;
use shared_types::{BlockHash, BlockItem, Subtree};

use crate::domain::errors::VerificationError;

/// A hashed item, tagged with the subtree it belongs to.
pub type Leaf = (Subtree, BlockHash);

/// Hash one non-proof item: `sha384` over its canonical encoding.
pub fn hash_leaf(block_number: u64, item: &BlockItem) -> Result<Leaf, VerificationError> {
    let malformed = |reason: String| VerificationError::MalformedItem {
        block_number,
        reason,
    };

    let subtree = item
        .subtree()
        .ok_or_else(|| malformed(format!("{} is not a leaf", item.kind_name())))?;
    if item.has_block_header() {
        item.block_header().map_err(|e| malformed(e.to_string()))?;
    }
    let bytes = item.encode().map_err(|e| malformed(e.to_string()))?;
    Ok((subtree, sha384_hash(&bytes)))
}

/// Hash items in order on the calling thread.
pub fn hash_leaves(block_number: u64, items: &[BlockItem]) -> Result<Vec<Leaf>, VerificationError> {
    items.iter().map(|item| hash_leaf(block_number, item)).collect()
}

/// Hash items on the current rayon pool. Output order matches input order.
pub fn hash_leaves_parallel(
    block_number: u64,
    items: &[BlockItem],
) -> Result<Vec<Leaf>, VerificationError> {
    items
        .par_iter()
        .map(|item| hash_leaf(block_number, item))
        .collect()
}

/// Split a slice at its closing proof: `(leaves, proof)`. Items after the
/// proof are not part of the block.
pub fn split_at_proof(items: &[BlockItem]) -> (&[BlockItem], Option<&BlockItem>) {
    match items.iter().position(BlockItem::has_block_proof) {
        Some(index) => (&items[..index], Some(&items[index])),
        None => (items, None),
    }
}

/// Leaves of both subtrees, in arrival order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockAccumulator {
    input: Vec<BlockHash>,
    output: Vec<BlockHash>,
}

impl BlockAccumulator {
    pub fn push(&mut self, (subtree, hash): Leaf) {
        match subtree {
            Subtree::Input => self.input.push(hash),
            Subtree::Output => self.output.push(hash),
        }
    }

    pub fn extend(&mut self, leaves: impl IntoIterator<Item = Leaf>) {
        for leaf in leaves {
            self.push(leaf);
        }
    }

    pub fn input_leaves(&self) -> &[BlockHash] {
        &self.input
    }

    pub fn output_leaves(&self) -> &[BlockHash] {
        &self.output
    }

    pub fn leaf_count(&self) -> usize {
        self.input.len() + self.output.len()
    }
}
