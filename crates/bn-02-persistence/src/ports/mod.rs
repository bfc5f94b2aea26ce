//! Ports for the persistence subsystem.

pub mod outbound;

pub use outbound::BlockStorage;
