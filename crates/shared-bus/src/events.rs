//! # Mediator Events
//!
//! What the mediator hands to every subscriber: a block item or an
//! end-of-stream notice, stamped with its position in the global sequence.

use shared_types::{BlockItem, EndOfStream};

/// Payload of one mediator event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventPayload {
    Item(BlockItem),
    /// Sent to consumers just before the mediator closes them.
    EndOfStream(EndOfStream),
}

/// One entry of the global publish sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediatorEvent {
    /// Strictly increasing across all publishes.
    pub sequence: u64,
    pub payload: EventPayload,
}

impl MediatorEvent {
    pub fn item(&self) -> Option<&BlockItem> {
        match &self.payload {
            EventPayload::Item(item) => Some(item),
            EventPayload::EndOfStream(_) => None,
        }
    }
}
