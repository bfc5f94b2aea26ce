//! # Mediator Adapter
//!
//! Lets the acknowledgment coordinator close live consumers without
//! depending on the mediator crate.

use std::sync::Arc;

use async_trait::async_trait;
use bn_04_acknowledgment::ConsumerTerminator;
use shared_bus::BroadcastMediator;
use shared_types::EndOfStream;

pub struct MediatorConsumerTerminator {
    mediator: Arc<BroadcastMediator>,
}

impl MediatorConsumerTerminator {
    pub fn new(mediator: Arc<BroadcastMediator>) -> Self {
        Self { mediator }
    }
}

#[async_trait]
impl ConsumerTerminator for MediatorConsumerTerminator {
    async fn terminate_consumers(&self, notice: EndOfStream) -> usize {
        self.mediator.close_consumers(notice).await
    }
}
