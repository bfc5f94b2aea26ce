//! # Shared Ports
//!
//! The single reporting seam between the workers and the authority on
//! block finality.

use async_trait::async_trait;

use crate::results::{BlockPersistenceResult, VerificationResult};

/// Receives every terminal result the writer and verifier produce.
///
/// Results for the same block number may arrive in either order and from
/// different tasks.
#[async_trait]
pub trait AckHandler: Send + Sync {
    async fn block_persisted(&self, result: BlockPersistenceResult);

    async fn block_verified(&self, result: VerificationResult);

    /// A routing handler hit a fault it cannot attribute to a block number.
    async fn unrecoverable_error(&self, reason: String);
}
