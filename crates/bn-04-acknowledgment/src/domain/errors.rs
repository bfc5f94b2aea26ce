use thiserror::Error;

/// Errors from the coordinator's outbound collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AckError {
    #[error("Artifact store error for block {block_number}: {reason}")]
    ArtifactStore { block_number: u64, reason: String },
}
