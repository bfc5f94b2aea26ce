//! # Block Storage Adapter
//!
//! Runs the coordinator's artifact promotions and removals against the
//! blocking storage port on tokio's blocking pool. A finalized block gives
//! up its writer claim, so later copies fall back to the verified check.

use std::sync::Arc;

use async_trait::async_trait;
use bn_02_persistence::{BlockStorage, InFlightBlocks, StorageError};
use bn_04_acknowledgment::{AckError, ArtifactStore};

pub struct StorageArtifactStore {
    storage: Arc<dyn BlockStorage>,
    in_flight: InFlightBlocks,
}

impl StorageArtifactStore {
    pub fn new(storage: Arc<dyn BlockStorage>, in_flight: InFlightBlocks) -> Self {
        Self { storage, in_flight }
    }

    async fn run<F>(&self, block_number: u64, op: F) -> Result<(), AckError>
    where
        F: FnOnce(&dyn BlockStorage) -> Result<(), StorageError> + Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        let to_ack_error = |reason: String| AckError::ArtifactStore {
            block_number,
            reason,
        };
        tokio::task::spawn_blocking(move || op(storage.as_ref()))
            .await
            .map_err(|e| to_ack_error(e.to_string()))?
            .map_err(|e| to_ack_error(e.to_string()))
    }
}

#[async_trait]
impl ArtifactStore for StorageArtifactStore {
    async fn mark_verified(&self, block_number: u64) -> Result<(), AckError> {
        self.run(block_number, move |storage| storage.mark_verified(block_number))
            .await?;
        self.in_flight.forget(block_number);
        Ok(())
    }

    async fn remove_unverified(&self, block_number: u64) -> Result<(), AckError> {
        self.run(block_number, move |storage| {
            storage.remove_unverified(block_number)
        })
        .await?;
        self.in_flight.forget(block_number);
        Ok(())
    }
}
