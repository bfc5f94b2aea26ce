//! # Verification Session API
//!
//! One session per block number, created from the block's header. Both
//! execution strategies implement this trait and produce bit-identical
//! results for the same items.

use async_trait::async_trait;
use shared_types::BlockItem;

use crate::domain::result::VerificationResultHandle;

#[async_trait]
pub trait VerificationSession: Send + Sync {
    fn block_number(&self) -> u64;

    /// Feed the next slice of the block's items, header first.
    ///
    /// Slices must be disjoint and in order. Calls after the session
    /// terminated are ignored.
    async fn append_block_items(&self, items: Vec<BlockItem>);

    /// Handle to the session's single result.
    fn result_handle(&self) -> VerificationResultHandle;

    fn is_terminated(&self) -> bool;
}
