//! Storage adapters implementing [`BlockStorage`](crate::ports::BlockStorage).

pub mod codec;
pub mod file;
pub mod layout;
pub mod memory;

pub use codec::{CompressionConfig, CompressionKind};
pub use file::FileBlockStorage;
pub use layout::BlockPathResolver;
pub use memory::InMemoryBlockStorage;
