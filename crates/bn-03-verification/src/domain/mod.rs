//! Domain layer: tree math, leaf accumulation, session state and the
//! single-resolution result handle.

pub mod accumulator;
pub mod errors;
pub mod merkle;
pub mod result;
pub mod session;

pub use accumulator::{hash_leaf, hash_leaves, hash_leaves_parallel, split_at_proof, BlockAccumulator, Leaf};
pub use errors::VerificationError;
pub use merkle::{
    compute_block_hash, inclusion_proof, root_of, root_of_parallel, verify_inclusion, MerkleProof,
    ProofStep, SiblingPosition,
};
pub use result::{result_channel, ResultResolver, SessionOutcome, VerificationResultHandle};
pub use session::SessionState;
