//! # Block Acknowledgment Subsystem (BN-04)
//!
//! Decides when a block is final. A block is acknowledged once it has been
//! both persisted and verified, and never before every lower block number
//! has been acknowledged.
//!
//! ## Architecture
//!
//! ```text
//!  PersistenceHandler ──block_persisted──┐
//!                                        ├──► AckCoordinator ──► AckLedger
//!  VerificationHandler ──block_verified──┘         │
//!                                                   ├──► ArtifactStore::mark_verified
//!                                                   ├──► ProducerNotifier::send_ack
//!                                                   └──► ServiceStatus (finality cursor)
//!
//!  any failure ──► stop_running ─► end-of-stream to producers and consumers
//!                  ─► remove unverified artifact ─► stop listener
//! ```
//!
//! ## Invariants
//!
//! | Rule | Enforcement |
//! |------|-------------|
//! | In-order finality | `AckLedger::take_ready` only releases `next_expected` |
//! | One ack per block | ready blocks are removed from the ledger when taken |
//! | Stale results absorbed | numbers below the cursor never reach the buffer |
//! | Single failure transition | `compare_exchange` on the coordinator's failed flag |
//! | Cursor never regresses | `ServiceStatus::set_latest_acked_block` |

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;


pub use adapters::{BroadcastNotifier, ProducerResponses, DEFAULT_RESPONSE_CAPACITY};
pub use domain::{AckError, AckLedger, FailureCause, ReadyBlock, Verdict};
pub use ports::{ArtifactStore, ConsumerTerminator, ProducerNotifier};
pub use service::{AckConfig, AckCoordinator};
