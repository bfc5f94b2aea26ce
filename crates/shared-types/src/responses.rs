//! # Stream Responses
//!
//! Opaque response objects handed to the transport layer: acknowledgements
//! and end-of-stream notices for producers, items and status codes for
//! consumers.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

use crate::entities::{BlockHash, BlockItem};

/// Positive acknowledgement of a finalized block.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub block_number: u64,
    #[serde_as(as = "Bytes")]
    pub block_hash: BlockHash,
    /// The block was already stored when this producer sent it.
    pub block_already_exists: bool,
}

/// Reason codes carried by an end-of-stream notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndOfStreamCode {
    StreamItemsUnknown,
    StreamItemsSuccess,
    StreamItemsBadStateProof,
    StreamItemsInternalError,
    StreamItemsPersistenceFailed,
    /// The node no longer accepts streams.
    StreamItemsNotAvailable,
}

/// Terminal notice closing a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndOfStream {
    pub code: EndOfStreamCode,
    /// Latest block number the node acknowledged, if any.
    pub block_number: Option<u64>,
}

/// Messages sent back to producers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishResponse {
    Acknowledgement(Acknowledgement),
    EndOfStream(EndOfStream),
}

/// Consumer stream status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscribeStreamStatus {
    ReadStreamSuccess,
    ReadStreamNotAvailable,
    ReadStreamInvalidStartBlockNumber,
    /// The stream was closed by the node after a pipeline failure.
    ReadStreamEndOfStream(EndOfStreamCode),
}

/// Messages sent to live consumers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscribeResponse {
    Item(BlockItem),
    Status(SubscribeStreamStatus),
}
