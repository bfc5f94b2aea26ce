//! Ports: what the coordinator drives when it decides.

pub mod outbound;

pub use outbound::{ArtifactStore, ConsumerTerminator, ProducerNotifier};
