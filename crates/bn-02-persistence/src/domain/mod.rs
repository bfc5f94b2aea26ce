//! Domain layer: the writer state machine, per-block claims and storage errors.

pub mod errors;
pub mod in_flight;
pub mod writer;


pub use errors::StorageError;
pub use in_flight::InFlightBlocks;
pub use writer::{AsyncBlockWriter, WriterMessage};
