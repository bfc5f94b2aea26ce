//! Domain layer: result pairing, ordering and failure classification.

pub mod errors;
pub mod ledger;

pub use errors::AckError;
pub use ledger::{AckLedger, FailureCause, ReadyBlock, Verdict};
