//! Adapters: producer-facing response delivery.

pub mod notifier;

pub use notifier::{BroadcastNotifier, ProducerResponses, DEFAULT_RESPONSE_CAPACITY};
