//! Producer response fan-out over a tokio broadcast channel.

use std::sync::Arc;

use bn_telemetry::BlockNodeMetrics;
use shared_types::{Acknowledgement, EndOfStream, PublishResponse};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::ports::outbound::ProducerNotifier;

/// Default number of responses buffered per producer.
pub const DEFAULT_RESPONSE_CAPACITY: usize = 1024;

pub struct BroadcastNotifier {
    sender: broadcast::Sender<PublishResponse>,
    metrics: Arc<BlockNodeMetrics>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize, metrics: Arc<BlockNodeMetrics>) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender, metrics }
    }

    /// Register a producer. Responses sent before this call are not seen.
    pub fn subscribe(&self) -> ProducerResponses {
        self.metrics.producers.inc();
        ProducerResponses {
            receiver: self.sender.subscribe(),
            metrics: Arc::clone(&self.metrics),
        }
    }

    pub fn producer_count(&self) -> usize {
        self.sender.receiver_count()
    }

    fn send(&self, response: PublishResponse) {
        if self.sender.send(response).is_err() {
            debug!("No producers connected, response dropped");
        }
    }
}

impl ProducerNotifier for BroadcastNotifier {
    fn send_ack(&self, ack: Acknowledgement) {
        self.send(PublishResponse::Acknowledgement(ack));
    }

    fn send_end_of_stream(&self, notice: EndOfStream) {
        self.send(PublishResponse::EndOfStream(notice));
    }
}

/// One producer's view of the response stream.
pub struct ProducerResponses {
    receiver: broadcast::Receiver<PublishResponse>,
    metrics: Arc<BlockNodeMetrics>,
}

impl ProducerResponses {
    /// Next response, or `None` once the notifier is gone.
    ///
    /// A producer that falls behind skips the responses it missed.
    pub async fn recv(&mut self) -> Option<PublishResponse> {
        loop {
            match self.receiver.recv().await {
                Ok(response) => return Some(response),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Producer lagging, responses skipped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for ProducerResponses {
    fn drop(&mut self) {
        self.metrics.producers.dec();
    }
}
