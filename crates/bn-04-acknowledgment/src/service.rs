//! # Acknowledgement Coordinator
//!
//! The single authority on block finality.
//!
//! Every result goes through the ledger under one lock, and the blocks it
//! releases are promoted and acknowledged before that lock is dropped, so
//! acknowledgements leave in block order even when results race.
//!
//! ## Failure Transition
//!
//! Taken at most once per node:
//!
//! 1. stop accepting publishes (`ServiceStatus::stop_running`)
//! 2. interrupt in-flight writers and verification sessions
//! 3. send an end-of-stream notice to producers
//! 4. deliver the notice to every consumer and unsubscribe it
//! 5. remove the failed block's unverified artifact
//! 6. stop the listener after the shutdown delay
//!
//! Later failures are absorbed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bn_telemetry::BlockNodeMetrics;
use shared_types::{
    hash_hex, Acknowledgement, AckHandler, BlockInfo, BlockPersistenceResult, EndOfStream,
    ServiceStatus, VerificationResult,
};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::domain::ledger::{AckLedger, FailureCause, Verdict};
use crate::ports::outbound::{ArtifactStore, ConsumerTerminator, ProducerNotifier};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AckConfig {
    /// Record nothing and acknowledge nothing.
    pub skip_acknowledgement: bool,
    /// First block number this node expects to acknowledge.
    pub first_block_number: u64,
}

impl Default for AckConfig {
    fn default() -> Self {
        Self {
            skip_acknowledgement: false,
            first_block_number: 1,
        }
    }
}

pub struct AckCoordinator {
    config: AckConfig,
    ledger: Mutex<AckLedger>,
    failed: AtomicBool,
    service_status: Arc<ServiceStatus>,
    notifier: Arc<dyn ProducerNotifier>,
    consumers: Arc<dyn ConsumerTerminator>,
    artifacts: Arc<dyn ArtifactStore>,
    metrics: Arc<BlockNodeMetrics>,
    /// Shared with every writer and verification session of the node.
    shutdown: Arc<watch::Sender<bool>>,
}

impl AckCoordinator {
    pub fn new(
        config: AckConfig,
        service_status: Arc<ServiceStatus>,
        notifier: Arc<dyn ProducerNotifier>,
        consumers: Arc<dyn ConsumerTerminator>,
        artifacts: Arc<dyn ArtifactStore>,
        metrics: Arc<BlockNodeMetrics>,
        shutdown: Arc<watch::Sender<bool>>,
    ) -> Self {
        if config.skip_acknowledgement {
            warn!("Acknowledgements disabled");
        }
        Self {
            ledger: Mutex::new(AckLedger::new(config.first_block_number)),
            config,
            failed: AtomicBool::new(false),
            service_status,
            notifier,
            consumers,
            artifacts,
            metrics,
            shutdown,
        }
    }

    /// Whether the failure transition has been taken.
    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    pub async fn last_acknowledged(&self) -> Option<u64> {
        self.ledger.lock().await.last_acknowledged()
    }

    pub async fn pending_count(&self) -> usize {
        self.ledger.lock().await.pending_count()
    }

    async fn on_result(&self, record: impl FnOnce(&mut AckLedger) -> Verdict) {
        if self.config.skip_acknowledgement {
            return;
        }
        if self.is_failed() {
            debug!("Node already failing, result absorbed");
            return;
        }

        let failure = {
            let mut ledger = self.ledger.lock().await;
            match record(&mut ledger) {
                Verdict::Recorded => self.release_ready(&mut ledger).await.err(),
                Verdict::Discarded { block_number } => {
                    info!(block_number, "Block discarded, awaiting resend");
                    None
                }
                Verdict::Superseded { block_number } => {
                    debug!(block_number, "Later copy of a persisted block absorbed");
                    None
                }
                Verdict::Stale { block_number } => {
                    warn!(
                        block_number,
                        last_acknowledged = ?ledger.last_acknowledged(),
                        "Result for already finalized block absorbed"
                    );
                    None
                }
                Verdict::Failed(cause) => Some(cause),
            }
        };

        if let Some(cause) = failure {
            self.fail(cause).await;
        }
    }

    /// Promote and acknowledge every block the ledger releases, in order.
    async fn release_ready(&self, ledger: &mut AckLedger) -> Result<(), FailureCause> {
        while let Some(ready) = ledger.take_ready() {
            if self.is_failed() {
                return Ok(());
            }
            let block_number = ready.block_number;

            if !ready.already_existed {
                self.artifacts
                    .mark_verified(block_number)
                    .await
                    .map_err(|e| FailureCause::Promotion {
                        block_number,
                        reason: e.to_string(),
                    })?;
            }

            self.notifier.send_ack(Acknowledgement {
                block_number,
                block_hash: ready.block_hash,
                block_already_exists: ready.already_existed,
            });
            self.service_status.set_latest_acked_block(BlockInfo {
                block_number,
                block_hash: ready.block_hash,
            });
            self.metrics.acked_blocks.inc();
            ledger.acknowledge(block_number);

            info!(
                block_number,
                block_hash = %hash_hex(&ready.block_hash),
                already_existed = ready.already_existed,
                "Block acknowledged"
            );
        }
        Ok(())
    }

    async fn fail(&self, cause: FailureCause) {
        if self
            .failed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(cause = %cause, "Node already failing, failure absorbed");
            return;
        }
        error!(cause = %cause, "Pipeline failure, stopping ingestion");

        self.service_status.stop_running();
        self.shutdown.send_replace(true);
        self.ledger.lock().await.clear();

        let notice = EndOfStream {
            code: cause.end_of_stream_code(),
            block_number: self
                .service_status
                .latest_acked_block()
                .map(|info| info.block_number),
        };
        self.notifier.send_end_of_stream(notice);
        let closed = self.consumers.terminate_consumers(notice).await;

        if let Some(block_number) = cause.block_number() {
            if let Err(e) = self.artifacts.remove_unverified(block_number).await {
                error!(block_number, error = %e, "Could not remove unverified artifact");
            }
        }

        self.service_status.stop_listener();
        info!(consumers_closed = closed, code = ?notice.code, "Failure handling complete");
    }
}

#[async_trait]
impl AckHandler for AckCoordinator {
    async fn block_persisted(&self, result: BlockPersistenceResult) {
        debug!(block_number = result.block_number, status = %result.status, "Persistence result");
        self.on_result(|ledger| ledger.record_persisted(result)).await;
    }

    async fn block_verified(&self, result: VerificationResult) {
        debug!(block_number = result.block_number, status = %result.status, "Verification result");
        self.on_result(|ledger| ledger.record_verified(result)).await;
    }

    async fn unrecoverable_error(&self, reason: String) {
        self.fail(FailureCause::Unrecoverable(reason)).await;
    }
}
