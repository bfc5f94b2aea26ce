use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use shared_types::BlockItem;

use crate::domain::errors::StorageError;
use crate::ports::outbound::BlockStorage;

/// In-memory block storage for tests.
///
/// Failures can be switched on per operation. A failing write still leaves
/// the first half of the block behind, like a crash in the middle of a real
/// write would, so revert paths can be observed.
#[derive(Default)]
pub struct InMemoryBlockStorage {
    unverified: Mutex<HashMap<u64, Vec<BlockItem>>>,
    verified: Mutex<HashMap<u64, Vec<BlockItem>>>,
    fail_writes: AtomicBool,
    fail_removes: AtomicBool,
    fail_mark_verified: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryBlockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_mark_verified(&self, fail: bool) {
        self.fail_mark_verified.store(fail, Ordering::SeqCst);
    }

    /// Number of write attempts, failed ones included.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Seed a finalized block.
    pub fn insert_verified(&self, block_number: u64, items: Vec<BlockItem>) {
        self.verified.lock().insert(block_number, items);
    }

    pub fn verified_count(&self) -> usize {
        self.verified.lock().len()
    }

    pub fn unverified_count(&self) -> usize {
        self.unverified.lock().len()
    }
}

impl BlockStorage for InMemoryBlockStorage {
    fn exists_verified(&self, block_number: u64) -> Result<bool, StorageError> {
        Ok(self.verified.lock().contains_key(&block_number))
    }

    fn exists_unverified(&self, block_number: u64) -> Result<bool, StorageError> {
        Ok(self.unverified.lock().contains_key(&block_number))
    }

    fn write_unverified(
        &self,
        block_number: u64,
        items: &[BlockItem],
    ) -> Result<PathBuf, StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            let partial = items[..items.len() / 2].to_vec();
            self.unverified.lock().insert(block_number, partial);
            return Err(StorageError::Simulated("write"));
        }
        self.unverified.lock().insert(block_number, items.to_vec());
        Ok(PathBuf::from(format!("memory://unverified/{block_number}")))
    }

    fn remove_unverified(&self, block_number: u64) -> Result<(), StorageError> {
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(StorageError::Simulated("remove"));
        }
        self.unverified.lock().remove(&block_number);
        Ok(())
    }

    fn mark_verified(&self, block_number: u64) -> Result<(), StorageError> {
        if self.fail_mark_verified.load(Ordering::SeqCst) {
            return Err(StorageError::Simulated("mark verified"));
        }
        let items = self
            .unverified
            .lock()
            .remove(&block_number)
            .ok_or(StorageError::MissingUnverified(block_number))?;
        self.verified.lock().insert(block_number, items);
        Ok(())
    }

    fn read_block(&self, block_number: u64) -> Result<Option<Vec<BlockItem>>, StorageError> {
        if let Some(items) = self.verified.lock().get(&block_number) {
            return Ok(Some(items.clone()));
        }
        Ok(self.unverified.lock().get(&block_number).cloned())
    }
}
