//! # Integration Scenarios
//!
//! Each module starts real nodes over in-memory or on-disk storage and only
//! talks to them through sessions, the mediator and storage.

pub mod failure;
pub mod pipeline;
pub mod subscription;
pub mod verification;
