//! # Service Status
//!
//! Process-wide state: the running latch that gates new publishes, the
//! latest finalized block, and the listener stop signal.
//!
//! The running flag only ever goes from `true` to `false`; bringing the node
//! back requires a restart.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::entities::{hash_hex, BlockHash};

/// The latest block acknowledged as finalized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    pub block_number: u64,
    pub block_hash: BlockHash,
}

#[derive(Debug)]
pub struct ServiceStatus {
    running: AtomicBool,
    latest_acked: RwLock<Option<BlockInfo>>,
    listener_stop: watch::Sender<bool>,
    shutdown_delay: Duration,
}

impl ServiceStatus {
    /// `shutdown_delay` is how long the listener keeps running after
    /// [`stop_listener`](Self::stop_listener) so end-of-stream notices drain.
    pub fn new(shutdown_delay: Duration) -> Self {
        let (listener_stop, _) = watch::channel(false);
        Self {
            running: AtomicBool::new(true),
            latest_acked: RwLock::new(None),
            listener_stop,
            shutdown_delay,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Flip the latch. Returns `true` for the call that actually flipped it.
    pub fn stop_running(&self) -> bool {
        let flipped = self
            .running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if flipped {
            info!("Service stopped accepting new streams");
        }
        flipped
    }

    pub fn latest_acked_block(&self) -> Option<BlockInfo> {
        *self.latest_acked.read()
    }

    /// Record a newly finalized block. Regressions are rejected.
    pub fn set_latest_acked_block(&self, info: BlockInfo) {
        let mut latest = self.latest_acked.write();
        if let Some(current) = *latest {
            if info.block_number <= current.block_number {
                warn!(
                    current = current.block_number,
                    rejected = info.block_number,
                    "Refusing to move finality cursor backwards"
                );
                return;
            }
        }
        info!(
            block_number = info.block_number,
            block_hash = %hash_hex(&info.block_hash),
            "Latest acknowledged block updated"
        );
        *latest = Some(info);
    }

    /// Signal the public listener to stop after the configured delay.
    ///
    /// Outside a tokio runtime the signal is sent immediately.
    pub fn stop_listener(self: &Arc<Self>) {
        let status = Arc::clone(self);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(status.shutdown_delay).await;
                    status.signal_listener_stop();
                });
            }
            Err(_) => status.signal_listener_stop(),
        }
    }

    fn signal_listener_stop(&self) {
        self.listener_stop.send_replace(true);
        info!("Listener stop signalled");
    }

    pub fn is_listener_stopped(&self) -> bool {
        *self.listener_stop.borrow()
    }

    /// Resolves once the listener stop has been signalled.
    pub async fn listener_stopped(&self) {
        let mut rx = self.listener_stop.subscribe();
        // The sender lives in `self`, so the channel cannot close while awaited.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for ServiceStatus {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}
