//! # Shared Types Crate
//!
//! Domain entities and cross-crate contracts of the block node.
//!
//! ## Contents
//!
//! - **Entities**: `BlockItem`, `BlockHeader`, `BlockProof`, `MerkleTreeInfo`
//! - **Results**: `BlockPersistenceResult`, `VerificationResult`, reported as
//!   values, never as errors
//! - **Responses**: what producers and consumers receive back
//! - **Status**: the process-wide running latch and finality view
//! - **Ports**: `AckHandler`, the seam between workers and the coordinator

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod entities;
pub mod errors;
pub mod ports;
pub mod responses;
pub mod results;
pub mod status;

pub use entities::*;
pub use errors::ItemCodecError;
pub use ports::AckHandler;
pub use responses::*;
pub use results::*;
pub use status::{BlockInfo, ServiceStatus};
