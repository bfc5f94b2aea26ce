//! # Shared Bus - Broadcast Mediator
//!
//! In-process fan-out of the published block item stream.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │  Producer    │                    │  Subscriber  │
//! │  session     │    publish()       │  (router or  │
//! │              │ ──────┐            │   consumer)  │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │   Mediator   │ ─────────┘
//!                  │              │  per-subscriber queue + worker
//!                  └──────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - Every subscriber observes items in exactly the publish order, no gaps.
//! - A subscriber added mid-stream only sees items published after it joined.
//! - `publish` waits on a saturated consumer for a bounded time only, and on
//!   a saturated router for as long as it takes.
//! - Nothing is delivered to a subscriber after it was removed.
//! - A consumer whose queue saturates or whose handler fails is removed and
//!   not retried. A router that stops is removed and escalated.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;


pub use events::{EventPayload, MediatorEvent};
pub use publisher::{BroadcastMediator, MediatorConfig};
pub use subscriber::{HandlerError, HandlerKind, SubscriberId, SubscriptionHandler};

/// Maximum events to buffer per subscriber before backpressure.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
