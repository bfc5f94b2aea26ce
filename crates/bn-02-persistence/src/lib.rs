//! # Block Persistence Subsystem (BN-02)
//!
//! Writes every block to durable storage exactly once.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  item   ┌─────────────────────┐  WriterMessage  ┌──────────────────┐
//! │ Mediator │ ──────► │ PersistenceHandler  │ ──────────────► │ AsyncBlockWriter │
//! └──────────┘         │ (one open block)    │                 │ (one per block)  │
//!                      └─────────────────────┘                 └────────┬─────────┘
//!                                                                       │
//!                                     BlockStorage ◄────────────────────┤
//!                                     (unverified / live)               │
//!                                                                       ▼
//!                                                     AckHandler::block_persisted
//! ```
//!
//! ## Invariants
//!
//! | Rule | Enforcement |
//! |------|-------------|
//! | One result per writer | `AsyncBlockWriter::run` reports exactly once |
//! | No duplicate artifacts | one writer per block number, verified copy checked before writing |
//! | No partial artifacts | failed or interrupted writes are reverted |
//! | Errors are values | storage errors become `BlockPersistenceStatus` |

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{
    BlockPathResolver, CompressionConfig, CompressionKind, FileBlockStorage, InMemoryBlockStorage,
    PersistenceHandler,
};
pub use domain::{AsyncBlockWriter, InFlightBlocks, StorageError, WriterMessage};
pub use ports::BlockStorage;
pub use service::{WriterFactory, WriterHandle, DEFAULT_WRITER_QUEUE_CAPACITY};
