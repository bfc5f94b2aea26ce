//! Ports: the session contract the routing handler drives.

pub mod inbound;

pub use inbound::VerificationSession;
