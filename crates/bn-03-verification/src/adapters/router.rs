//! # Verification Routing Handler
//!
//! Mediator subscriber that feeds each block's items to that block's
//! session and reports the session's result to the ack handler.
//!
//! - A header opens a new session. A session still open at that point was
//!   superseded (its block never got a proof) and is dropped unreported.
//! - Each header's `previous_block_hash` is compared with the hash this
//!   node computed for the previous block; a mismatch is logged and
//!   counted. The comparison is skipped while that hash is still being
//!   computed.
//! - An unparsable header has no block to report against and is escalated
//!   through [`AckHandler::unrecoverable_error`].

use std::sync::Arc;

use async_trait::async_trait;
use bn_telemetry::BlockNodeMetrics;
use parking_lot::Mutex as SyncMutex;
use shared_bus::{EventPayload, HandlerError, HandlerKind, MediatorEvent, SubscriptionHandler};
use shared_types::{hash_hex, AckHandler, BlockHeader, BlockInfo, BlockItem, VerificationResult};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, warn};

use crate::domain::result::VerificationResultHandle;
use crate::ports::inbound::VerificationSession;
use crate::service::SessionFactory;

pub struct VerificationHandler {
    factory: SessionFactory,
    ack_handler: Arc<dyn AckHandler>,
    metrics: Arc<BlockNodeMetrics>,
    shutdown: watch::Receiver<bool>,
    current: Mutex<Option<Box<dyn VerificationSession>>>,
    /// Last block hash computed by this node.
    last_computed: Arc<SyncMutex<Option<BlockInfo>>>,
}

impl VerificationHandler {
    pub fn new(
        factory: SessionFactory,
        ack_handler: Arc<dyn AckHandler>,
        metrics: Arc<BlockNodeMetrics>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            factory,
            ack_handler,
            metrics,
            shutdown,
            current: Mutex::new(None),
            last_computed: Arc::new(SyncMutex::new(None)),
        }
    }

    async fn route(&self, item: &BlockItem) {
        let mut current = self.current.lock().await;

        if item.has_block_header() {
            if let Some(previous) = current.take() {
                debug!(
                    block_number = previous.block_number(),
                    "Header arrived before proof, dropping session"
                );
            }
            match item.block_header() {
                Ok(header) => {
                    self.check_chain(&header);
                    let session = self.factory.create(header);
                    self.report_when_done(session.result_handle());
                    session.append_block_items(vec![item.clone()]).await;
                    *current = Some(session);
                }
                Err(e) => {
                    error!(error = %e, "Unparsable block header");
                    let ack_handler = Arc::clone(&self.ack_handler);
                    let reason = format!("verification: {e}");
                    tokio::spawn(async move { ack_handler.unrecoverable_error(reason).await });
                }
            }
            return;
        }

        let Some(session) = current.as_ref() else {
            debug!(item = ?item, "No open session, dropping item");
            return;
        };
        session.append_block_items(vec![item.clone()]).await;
        if item.has_block_proof() {
            *current = None;
        }
    }

    fn check_chain(&self, header: &BlockHeader) {
        let last = *self.last_computed.lock();
        let Some(last) = last else {
            return;
        };
        if last.block_number.checked_add(1) != Some(header.number) {
            return;
        }
        if last.block_hash != header.previous_block_hash {
            self.metrics.previous_hash_mismatches.inc();
            warn!(
                block_number = header.number,
                expected = %hash_hex(&last.block_hash),
                received = %hash_hex(&header.previous_block_hash),
                "Previous block hash mismatch"
            );
        }
    }

    /// Forward the session's result to the ack handler once it resolves.
    fn report_when_done(&self, handle: VerificationResultHandle) {
        let ack_handler = Arc::clone(&self.ack_handler);
        let last_computed = Arc::clone(&self.last_computed);
        let mut shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let block_number = handle.block_number();
            let outcome = tokio::select! {
                outcome = handle.outcome() => outcome,
                _ = shutdown.wait_for(|stop| *stop) => {
                    debug!(block_number, "Shutdown before verification finished");
                    return;
                }
            };

            let result = match outcome {
                Ok(result) => result,
                Err(e) if e.is_interrupted() => {
                    debug!(block_number, error = %e, "Session ended without a result");
                    return;
                }
                Err(e) => {
                    warn!(block_number, error = %e, "Reporting verification error");
                    VerificationResult::error(block_number)
                }
            };
            if let Some(block_hash) = result.block_hash {
                let mut last = last_computed.lock();
                if last.map_or(true, |l| l.block_number < block_number) {
                    *last = Some(BlockInfo {
                        block_number,
                        block_hash,
                    });
                }
            }
            ack_handler.block_verified(result).await;
        });
    }
}

#[async_trait]
impl SubscriptionHandler for VerificationHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Verification
    }

    async fn on_event(&self, event: &MediatorEvent) -> Result<(), HandlerError> {
        if let EventPayload::Item(item) = &event.payload {
            self.route(item).await;
        }
        Ok(())
    }
}
