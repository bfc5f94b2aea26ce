//! # Event Handlers
//!
//! Mediator subscribers owned by the runtime rather than a subsystem.

pub mod consumer;

pub use consumer::LiveConsumerHandler;
