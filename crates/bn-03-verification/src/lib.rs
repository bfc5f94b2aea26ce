//! # Block Verification Subsystem (BN-03)
//!
//! Recomputes every block's hash from its items and checks the producer's
//! signature over it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  item   ┌──────────────────────┐  slices  ┌─────────────────────┐
//! │ Mediator │ ──────► │ VerificationHandler  │ ───────► │ VerificationSession │
//! └──────────┘         │ (one open session)   │          │ sync │ async (rayon)│
//!                      └──────────┬───────────┘          └──────────┬──────────┘
//!                                 │                                 │ resolve once
//!                                 │◄──── VerificationResultHandle ◄─┘
//!                                 ▼
//!                      AckHandler::block_verified
//! ```
//!
//! ## Invariants
//!
//! | Rule | Enforcement |
//! |------|-------------|
//! | One result per session | `ResultResolver` accepts only the first outcome |
//! | Metrics once per session | recorded by the resolving call only |
//! | Strategies agree | both use the same leaf hashing and padded-tree roots |
//! | Proofs are self-contained | `verify_inclusion` needs only leaf, path, block hash |
//! | Signature mismatch is data | `INVALID_HASH_OR_SIGNATURE`, never an error |

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;


pub use adapters::{AsyncVerificationSession, SyncVerificationSession, VerificationHandler};
pub use domain::{
    compute_block_hash, hash_leaf, inclusion_proof, root_of, verify_inclusion, MerkleProof,
    ProofStep, SessionOutcome, SiblingPosition, VerificationError, VerificationResultHandle,
};
pub use ports::VerificationSession;
pub use service::{
    SessionFactory, SessionType, VerificationConfig, DEFAULT_HASH_COMBINE_BATCH_SIZE,
    DEFAULT_SESSION_QUEUE_CAPACITY,
};
