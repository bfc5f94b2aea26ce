//! # Producer and Consumer Sessions
//!
//! The in-process transport boundary: what a streaming RPC layer would hold
//! per connection.

use std::sync::Arc;

use bn_04_acknowledgment::ProducerResponses;
use shared_bus::{BroadcastMediator, SubscriberId};
use shared_types::{BlockItem, PublishResponse, ServiceStatus, SubscribeResponse};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::errors::NodeError;

/// One connected producer.
pub struct ProducerSession {
    mediator: Arc<BroadcastMediator>,
    service_status: Arc<ServiceStatus>,
    responses: ProducerResponses,
}

impl ProducerSession {
    pub(crate) fn new(
        mediator: Arc<BroadcastMediator>,
        service_status: Arc<ServiceStatus>,
        responses: ProducerResponses,
    ) -> Self {
        Self {
            mediator,
            service_status,
            responses,
        }
    }

    /// Publish one item. Returns its position in the global sequence.
    pub async fn publish(&self, item: BlockItem) -> Result<u64, NodeError> {
        self.ensure_running()?;
        Ok(self.mediator.publish(item).await)
    }

    /// Publish items as one uninterrupted run of the sequence.
    pub async fn publish_batch(&self, items: Vec<BlockItem>) -> Result<Option<u64>, NodeError> {
        self.ensure_running()?;
        Ok(self.mediator.publish_batch(items).await)
    }

    /// Next acknowledgement or end-of-stream notice.
    pub async fn next_response(&mut self) -> Option<PublishResponse> {
        self.responses.recv().await
    }

    fn ensure_running(&self) -> Result<(), NodeError> {
        if self.service_status.is_running() {
            Ok(())
        } else {
            Err(NodeError::NotAvailable)
        }
    }
}

/// One live consumer stream.
pub struct ConsumerSession {
    id: SubscriberId,
    mediator: Arc<BroadcastMediator>,
    receiver: mpsc::Receiver<SubscribeResponse>,
}

impl ConsumerSession {
    pub(crate) fn new(
        id: SubscriberId,
        mediator: Arc<BroadcastMediator>,
        receiver: mpsc::Receiver<SubscribeResponse>,
    ) -> Self {
        Self {
            id,
            mediator,
            receiver,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next item or status, `None` once the stream has closed.
    pub async fn recv(&mut self) -> Option<SubscribeResponse> {
        self.receiver.recv().await
    }

    /// Unsubscribe. Nothing published afterwards is delivered.
    pub async fn close(self) {
        if self.mediator.unsubscribe(self.id).await {
            debug!(subscriber = %self.id, "Consumer closed");
        }
    }

    /// The remaining responses as a stream. The subscription ends when the
    /// stream is dropped.
    pub fn into_stream(self) -> ReceiverStream<SubscribeResponse> {
        ReceiverStream::new(self.receiver)
    }
}
