//! # Subsystem Container
//!
//! Node configuration and the container that builds and wires the
//! subsystems.

pub mod config;
pub mod subsystems;

pub use config::{ConfigError, ConsumerConfig, NodeConfig, PersistenceConfig, ServiceConfig};
pub use subsystems::SubsystemContainer;
