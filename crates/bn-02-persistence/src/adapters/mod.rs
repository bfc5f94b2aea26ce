//! Adapters: storage backends and the mediator-facing router.

pub mod router;
pub mod storage;

pub use router::PersistenceHandler;
pub use storage::{
    BlockPathResolver, CompressionConfig, CompressionKind, FileBlockStorage, InMemoryBlockStorage,
};
