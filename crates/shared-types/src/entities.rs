//! # Block Stream Entities
//!
//! The data model carried through the pipeline. A block is the ordered
//! sequence of [`BlockItem`]s from one `Header` to its matching `Proof`.
//!
//! Header and proof payloads travel *encoded*: they are parsed only by the
//! components that interpret them (writer, verification session), so a
//! malformed payload surfaces as a real parse failure at that point instead
//! of being rejected at ingestion.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;

use crate::errors::ItemCodecError;

/// Length of a SHA-384 digest.
pub const HASH_LENGTH: usize = 48;

/// A SHA-384 digest (item hash, subtree root or block hash).
pub type BlockHash = [u8; HASH_LENGTH];

/// The all-zero hash, used as "previous block hash" of the first block.
pub const ZERO_HASH: BlockHash = [0u8; HASH_LENGTH];

/// Render a hash as lowercase hex for logs.
pub fn hash_hex(hash: &BlockHash) -> String {
    hex::encode(hash)
}

// =============================================================================
// HEADER & PROOF
// =============================================================================

/// Protocol version stamped into each block header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

/// Opens a block. Only `number` is interpreted by the pipeline.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block number (non-negative by construction).
    pub number: u64,
    /// Hash of the previous block, checked against the chain by the verifier.
    #[serde_as(as = "Bytes")]
    pub previous_block_hash: BlockHash,
    /// Protocol version of the producer.
    pub hapi_proto_version: SemanticVersion,
}

impl BlockHeader {
    pub fn new(number: u64, previous_block_hash: BlockHash) -> Self {
        Self {
            number,
            previous_block_hash,
            hapi_proto_version: SemanticVersion::default(),
        }
    }
}

/// Closes a block. Carries the roots the block hash is derived from and the
/// signature over that hash.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockProof {
    /// Number of the block this proof closes.
    pub block: u64,
    #[serde_as(as = "Bytes")]
    pub previous_block_root_hash: BlockHash,
    #[serde_as(as = "Bytes")]
    pub start_of_block_state_root_hash: BlockHash,
    /// Signature over the computed block hash.
    pub block_signature: Vec<u8>,
}

// =============================================================================
// BLOCK ITEM
// =============================================================================

/// Kinds of items that are carried opaquely between a header and a proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    EventHeader,
    RoundHeader,
    EventTransaction,
    TransactionResult,
    TransactionOutput,
    StateChanges,
}

/// Which Merkle subtree an item is hashed into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Subtree {
    Input,
    Output,
}

/// Smallest unit of streamed data.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockItem {
    /// Encoded [`BlockHeader`].
    Header(Vec<u8>),
    /// Encoded [`BlockProof`].
    Proof(Vec<u8>),
    /// Everything else: hashed, never interpreted.
    Other { kind: ItemKind, payload: Vec<u8> },
}

impl BlockItem {
    /// Encode a header into an item.
    pub fn header(header: &BlockHeader) -> Result<Self, ItemCodecError> {
        bincode::serialize(header)
            .map(Self::Header)
            .map_err(|e| ItemCodecError::Encode(e.to_string()))
    }

    /// Encode a proof into an item.
    pub fn proof(proof: &BlockProof) -> Result<Self, ItemCodecError> {
        bincode::serialize(proof)
            .map(Self::Proof)
            .map_err(|e| ItemCodecError::Encode(e.to_string()))
    }

    /// An opaque body item.
    pub fn other(kind: ItemKind, payload: impl Into<Vec<u8>>) -> Self {
        Self::Other {
            kind,
            payload: payload.into(),
        }
    }

    pub fn has_block_header(&self) -> bool {
        matches!(self, Self::Header(_))
    }

    pub fn has_block_proof(&self) -> bool {
        matches!(self, Self::Proof(_))
    }

    /// Parse the header payload.
    pub fn block_header(&self) -> Result<BlockHeader, ItemCodecError> {
        match self {
            Self::Header(bytes) => bincode::deserialize(bytes)
                .map_err(|e| ItemCodecError::MalformedHeader(e.to_string())),
            _ => Err(ItemCodecError::UnexpectedKind {
                expected: "header",
                found: self.kind_name(),
            }),
        }
    }

    /// Parse the proof payload.
    pub fn block_proof(&self) -> Result<BlockProof, ItemCodecError> {
        match self {
            Self::Proof(bytes) => bincode::deserialize(bytes)
                .map_err(|e| ItemCodecError::MalformedProof(e.to_string())),
            _ => Err(ItemCodecError::UnexpectedKind {
                expected: "proof",
                found: self.kind_name(),
            }),
        }
    }

    /// Canonical byte encoding; the input to the item hash.
    pub fn encode(&self) -> Result<Vec<u8>, ItemCodecError> {
        bincode::serialize(self).map_err(|e| ItemCodecError::Encode(e.to_string()))
    }

    /// Merkle subtree this item belongs to. Proofs are never leaves.
    pub fn subtree(&self) -> Option<Subtree> {
        match self {
            Self::Header(_) => Some(Subtree::Input),
            Self::Proof(_) => None,
            Self::Other { kind, .. } => Some(match kind {
                ItemKind::EventHeader | ItemKind::RoundHeader | ItemKind::EventTransaction => {
                    Subtree::Input
                }
                ItemKind::TransactionResult
                | ItemKind::TransactionOutput
                | ItemKind::StateChanges => Subtree::Output,
            }),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Header(_) => "header",
            Self::Proof(_) => "proof",
            Self::Other { kind, .. } => match kind {
                ItemKind::EventHeader => "event_header",
                ItemKind::RoundHeader => "round_header",
                ItemKind::EventTransaction => "event_transaction",
                ItemKind::TransactionResult => "transaction_result",
                ItemKind::TransactionOutput => "transaction_output",
                ItemKind::StateChanges => "state_changes",
            },
        }
    }
}

// Payloads can be large; log the shape only.
impl fmt::Debug for BlockItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = match self {
            Self::Header(b) | Self::Proof(b) => b.len(),
            Self::Other { payload, .. } => payload.len(),
        };
        write!(f, "BlockItem({}, {} bytes)", self.kind_name(), len)
    }
}

// =============================================================================
// MERKLE TREE INFO
// =============================================================================

/// Everything needed to rebuild an inclusion proof for any item of a block
/// without the session that produced it.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleTreeInfo {
    /// Leaf hashes of the input subtree, in item order.
    #[serde_as(as = "Vec<Bytes>")]
    pub input_tree_leaves: Vec<BlockHash>,
    /// Leaf hashes of the output subtree, in item order.
    #[serde_as(as = "Vec<Bytes>")]
    pub output_tree_leaves: Vec<BlockHash>,
    #[serde_as(as = "Bytes")]
    pub previous_block_root_hash: BlockHash,
    #[serde_as(as = "Bytes")]
    pub start_of_block_state_root_hash: BlockHash,
    #[serde_as(as = "Bytes")]
    pub block_hash: BlockHash,
}
