//! # Verification Result Handle
//!
//! Single-resolution result of one session. The resolver side is owned by
//! the session; any number of handles may await it. Dropping the resolver
//! unresolved (session superseded or its worker stopped) resolves every
//! handle to [`VerificationError::Interrupted`].

use shared_types::VerificationResult;
use tokio::sync::watch;

use crate::domain::errors::VerificationError;

/// Terminal outcome of a session.
pub type SessionOutcome = Result<VerificationResult, VerificationError>;

/// Creates a linked resolver and handle.
pub fn result_channel(block_number: u64) -> (ResultResolver, VerificationResultHandle) {
    let (sender, receiver) = watch::channel(None);
    (
        ResultResolver { sender },
        VerificationResultHandle {
            block_number,
            receiver,
        },
    )
}

/// Write side. Only the first `resolve` takes effect.
#[derive(Debug)]
pub struct ResultResolver {
    sender: watch::Sender<Option<SessionOutcome>>,
}

impl ResultResolver {
    /// Returns `true` if this call resolved the result.
    pub fn resolve(&self, outcome: SessionOutcome) -> bool {
        self.sender.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(outcome);
            true
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.sender.borrow().is_some()
    }
}

#[derive(Clone, Debug)]
pub struct VerificationResultHandle {
    block_number: u64,
    receiver: watch::Receiver<Option<SessionOutcome>>,
}

impl VerificationResultHandle {
    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    /// Wait for the outcome.
    pub async fn outcome(&self) -> SessionOutcome {
        let mut receiver = self.receiver.clone();
        let interrupted = VerificationError::Interrupted(self.block_number);
        let outcome = match receiver.wait_for(Option::is_some).await {
            Ok(slot) => (*slot).clone().unwrap_or(Err(interrupted)),
            Err(_) => Err(interrupted),
        };
        outcome
    }

    /// The outcome if already resolved.
    pub fn try_outcome(&self) -> Option<SessionOutcome> {
        (*self.receiver.borrow()).clone()
    }
}
