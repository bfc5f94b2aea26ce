//! # Subscribers
//!
//! The receiving side of the mediator: the handler interface, subscriber
//! identities and the per-subscriber delivery worker.

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::events::MediatorEvent;

/// The closed set of subscriber roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// Routes items to per-block writers.
    Persistence,
    /// Routes items to per-block verification sessions.
    Verification,
    /// A live downstream consumer.
    Consumer,
}

impl HandlerKind {
    /// Routers feed the pipeline itself, consumers only observe it.
    pub fn is_router(self) -> bool {
        matches!(self, Self::Persistence | Self::Verification)
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persistence => f.write_str("persistence"),
            Self::Verification => f.write_str("verification"),
            Self::Consumer => f.write_str("consumer"),
        }
    }
}

/// Errors a handler may return. Any error ends its subscription.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The downstream side went away.
    #[error("Downstream closed")]
    Closed,

    /// The downstream side did not drain in time.
    #[error("Downstream did not accept the event within {0:?}")]
    Timeout(Duration),

    #[error("Handler failed: {0}")]
    Failed(String),
}

/// A mediator subscriber.
#[async_trait]
pub trait SubscriptionHandler: Send + Sync {
    fn kind(&self) -> HandlerKind;

    /// Handle one event. Called sequentially in publish order.
    async fn on_event(&self, event: &MediatorEvent) -> Result<(), HandlerError>;
}

/// Opaque subscriber identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Drains one subscriber queue into its handler until the queue closes,
/// the subscriber is deactivated, or the handler fails.
///
/// `active` is checked before every delivery, so nothing is handed to a
/// handler after it has been unsubscribed.
pub(crate) async fn run_delivery(
    id: SubscriberId,
    handler: Arc<dyn SubscriptionHandler>,
    mut queue: mpsc::Receiver<Arc<MediatorEvent>>,
    active: Arc<AtomicBool>,
) {
    let kind = handler.kind();
    while let Some(event) = queue.recv().await {
        if !active.load(Ordering::Acquire) {
            break;
        }
        if let Err(e) = handler.on_event(&event).await {
            warn!(
                subscriber = %id,
                kind = %kind,
                sequence = event.sequence,
                error = %e,
                "Handler failed, ending subscription"
            );
            active.store(false, Ordering::Release);
            break;
        }
    }
    debug!(subscriber = %id, kind = %kind, "Delivery worker stopped");
}
