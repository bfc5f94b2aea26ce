//! Adapters: the two session strategies and the mediator-facing router.

pub mod async_session;
pub mod router;
pub mod sync_session;

pub use async_session::AsyncVerificationSession;
pub use router::VerificationHandler;
pub use sync_session::SyncVerificationSession;
