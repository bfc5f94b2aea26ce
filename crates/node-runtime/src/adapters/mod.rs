//! # Adapter Implementations
//!
//! Bridges between subsystem ports and the concrete components the node
//! wires together.
//!
//! ```text
//!   AckCoordinator ──ConsumerTerminator──► MediatorConsumerTerminator ──► BroadcastMediator
//!                  ──ArtifactStore───────► StorageArtifactStore ────────► BlockStorage
//!   SessionFactory ──SignatureVerifier───► verifier_from_config
//! ```

pub mod block_storage;
pub mod event_bus;
pub mod signature;

pub use block_storage::StorageArtifactStore;
pub use event_bus::MediatorConsumerTerminator;
pub use signature::verifier_from_config;
