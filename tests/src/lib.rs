//! # Block Node Test Suite
//!
//! End-to-end scenarios driving a whole node through its producer and
//! consumer sessions, plus criterion benchmarks for the hashing hot path.
//!
//! ## Structure
//!
//! - `fixtures` - signed chains, node start-up and bounded waits
//! - `integration::pipeline` - publish, persist, verify, acknowledge
//! - `integration::subscription` - consumers joining and leaving
//! - `integration::failure` - the single failure transition
//! - `integration::verification` - sync and async sessions agree
//!
//! ## Running
//!
//! ```bash
//! cargo test -p bn-tests
//! cargo bench -p bn-tests
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod fixtures;
pub mod integration;
