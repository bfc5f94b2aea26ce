//! # Live Consumer Handler
//!
//! Mediator subscriber that forwards the item stream to one downstream
//! consumer.
//!
//! - Forwarding starts at the first block header seen, so a consumer that
//!   joins mid-block never receives the tail of that block.
//! - A consumer that leaves its buffer full for longer than the timeout
//!   threshold is unsubscribed.
//! - An end-of-stream notice becomes a final status response.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bn_telemetry::BlockNodeMetrics;
use shared_bus::{EventPayload, HandlerError, HandlerKind, MediatorEvent, SubscriptionHandler};
use shared_types::{SubscribeResponse, SubscribeStreamStatus};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub struct LiveConsumerHandler {
    sender: mpsc::Sender<SubscribeResponse>,
    streaming: AtomicBool,
    timeout_threshold: Duration,
    metrics: Arc<BlockNodeMetrics>,
}

impl LiveConsumerHandler {
    pub fn new(
        sender: mpsc::Sender<SubscribeResponse>,
        timeout_threshold: Duration,
        metrics: Arc<BlockNodeMetrics>,
    ) -> Self {
        Self {
            sender,
            streaming: AtomicBool::new(false),
            timeout_threshold,
            metrics,
        }
    }

    async fn forward(&self, response: SubscribeResponse) -> Result<(), HandlerError> {
        self.sender
            .send_timeout(response, self.timeout_threshold)
            .await
            .map_err(|e| match e {
                mpsc::error::SendTimeoutError::Timeout(_) => {
                    HandlerError::Timeout(self.timeout_threshold)
                }
                mpsc::error::SendTimeoutError::Closed(_) => HandlerError::Closed,
            })
    }
}

#[async_trait]
impl SubscriptionHandler for LiveConsumerHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Consumer
    }

    async fn on_event(&self, event: &MediatorEvent) -> Result<(), HandlerError> {
        match &event.payload {
            EventPayload::Item(item) => {
                self.metrics.live_block_items_received.inc();
                if !self.streaming.load(Ordering::Acquire) {
                    if !item.has_block_header() {
                        debug!(sequence = event.sequence, "Waiting for a block header");
                        return Ok(());
                    }
                    self.streaming.store(true, Ordering::Release);
                    debug!(sequence = event.sequence, "Consumer stream started");
                }
                if let Err(e) = self.forward(SubscribeResponse::Item(item.clone())).await {
                    if let HandlerError::Timeout(threshold) = e {
                        warn!(?threshold, "Consumer not draining, unsubscribing");
                    }
                    return Err(e);
                }
                self.metrics.live_block_items_consumed.inc();
                Ok(())
            }
            EventPayload::EndOfStream(notice) => {
                info!(code = ?notice.code, "Sending end of stream to consumer");
                self.forward(SubscribeResponse::Status(
                    SubscribeStreamStatus::ReadStreamEndOfStream(notice.code),
                ))
                .await
            }
        }
    }
}
