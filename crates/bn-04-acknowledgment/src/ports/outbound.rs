//! # Outbound Ports
//!
//! The coordinator never talks to the mediator or the storage backend
//! directly; the node wires these ports to them.

use async_trait::async_trait;
use shared_types::{Acknowledgement, EndOfStream};

use crate::domain::errors::AckError;

/// Fan-out of responses to every connected producer.
pub trait ProducerNotifier: Send + Sync {
    fn send_ack(&self, ack: Acknowledgement);
    fn send_end_of_stream(&self, notice: EndOfStream);
}

/// Closes all live consumer streams.
#[async_trait]
pub trait ConsumerTerminator: Send + Sync {
    /// Deliver `notice` to every consumer and unsubscribe it. Returns how
    /// many consumers were closed.
    async fn terminate_consumers(&self, notice: EndOfStream) -> usize;
}

/// Block artifact lifecycle operations the coordinator owns.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Promote the unverified artifact of a finalized block.
    async fn mark_verified(&self, block_number: u64) -> Result<(), AckError>;

    /// Remove whatever unverified artifact exists for `block_number`.
    async fn remove_unverified(&self, block_number: u64) -> Result<(), AckError>;
}
