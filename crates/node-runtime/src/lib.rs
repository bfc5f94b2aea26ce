//! # Block Node Runtime
//!
//! Wires the mediator, persistence, verification and acknowledgment
//! subsystems into one node and exposes the producer and consumer sessions a
//! transport layer drives.
//!
//! ## Modules
//!
//! - `container/` - configuration and subsystem wiring
//! - `adapters/` - port implementations bridging subsystems
//! - `handlers/` - runtime-owned mediator subscribers (live consumers)
//! - `node` / `session` - the public entry points
//!
//! ## Usage
//!
//! ```rust,ignore
//! let node = BlockNode::start(NodeConfig::from_env()?).await?;
//! let mut producer = node.open_producer()?;
//! producer.publish(header_item).await?;
//! let response = producer.next_response().await;
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod container;
pub mod errors;
pub mod handlers;
pub mod node;
pub mod session;

pub use container::{ConfigError, NodeConfig, SubsystemContainer};
pub use errors::NodeError;
pub use node::BlockNode;
pub use session::{ConsumerSession, ProducerSession};
