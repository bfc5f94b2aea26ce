//! # Session Factory
//!
//! Builds one [`VerificationSession`] per block header using the configured
//! execution strategy. The async strategy shares one rayon pool across all
//! sessions of a node.

use std::str::FromStr;
use std::sync::Arc;

use bn_telemetry::BlockNodeMetrics;
use rayon::{ThreadPool, ThreadPoolBuilder};
use shared_crypto::SignatureVerifier;
use shared_types::BlockHeader;
use tokio::sync::watch;
use tracing::info;

use crate::adapters::{AsyncVerificationSession, SyncVerificationSession};
use crate::domain::errors::VerificationError;
use crate::domain::session::SessionState;
use crate::ports::inbound::VerificationSession;

/// Default combine batch size.
pub const DEFAULT_HASH_COMBINE_BATCH_SIZE: usize = 32;

/// Default capacity of an async session's slice queue.
pub const DEFAULT_SESSION_QUEUE_CAPACITY: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionType {
    /// Hash on the caller's task.
    Sync,
    /// Hash on the worker pool in batches.
    Async,
}

impl FromStr for SessionType {
    type Err = VerificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" => Ok(Self::Sync),
            "async" => Ok(Self::Async),
            other => Err(VerificationError::InvalidConfig(format!(
                "unknown session type '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationConfig {
    pub session_type: SessionType,
    /// Items per hashing batch and nodes per combine batch. Positive, even.
    pub hash_combine_batch_size: usize,
    /// Threads of the hashing pool (async strategy only).
    pub worker_threads: usize,
    pub session_queue_capacity: usize,
    /// Hex Ed25519 key block signatures are checked against.
    pub public_key_hex: Option<String>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            session_type: SessionType::Async,
            hash_combine_batch_size: DEFAULT_HASH_COMBINE_BATCH_SIZE,
            worker_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            session_queue_capacity: DEFAULT_SESSION_QUEUE_CAPACITY,
            public_key_hex: None,
        }
    }
}

impl VerificationConfig {
    pub fn validate(&self) -> Result<(), VerificationError> {
        if self.hash_combine_batch_size == 0 || self.hash_combine_batch_size % 2 != 0 {
            return Err(VerificationError::InvalidConfig(format!(
                "hash_combine_batch_size must be positive and even, got {}",
                self.hash_combine_batch_size
            )));
        }
        if self.worker_threads == 0 {
            return Err(VerificationError::InvalidConfig(
                "worker_threads must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct SessionFactory {
    config: VerificationConfig,
    verifier: Arc<dyn SignatureVerifier>,
    metrics: Arc<BlockNodeMetrics>,
    pool: Option<Arc<ThreadPool>>,
    shutdown: watch::Receiver<bool>,
}

impl SessionFactory {
    pub fn new(
        config: VerificationConfig,
        verifier: Arc<dyn SignatureVerifier>,
        metrics: Arc<BlockNodeMetrics>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, VerificationError> {
        config.validate()?;
        let pool = match config.session_type {
            SessionType::Sync => None,
            SessionType::Async => Some(Arc::new(
                ThreadPoolBuilder::new()
                    .num_threads(config.worker_threads)
                    .thread_name(|i| format!("bn-verify-{i}"))
                    .build()
                    .map_err(|e| VerificationError::Pool(e.to_string()))?,
            )),
        };
        info!(
            session_type = ?config.session_type,
            batch_size = config.hash_combine_batch_size,
            worker_threads = config.worker_threads,
            "Verification sessions configured"
        );
        Ok(Self {
            config,
            verifier,
            metrics,
            pool,
            shutdown,
        })
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    /// Open a session for the block `header` starts.
    pub fn create(&self, header: BlockHeader) -> Box<dyn VerificationSession> {
        let (state, handle) =
            SessionState::new(header, Arc::clone(&self.verifier), Arc::clone(&self.metrics));
        match &self.pool {
            None => Box::new(SyncVerificationSession::new(state, handle)),
            Some(pool) => Box::new(AsyncVerificationSession::spawn(
                state,
                handle,
                Arc::clone(pool),
                self.config.hash_combine_batch_size,
                self.config.session_queue_capacity,
                self.shutdown.clone(),
            )),
        }
    }
}
