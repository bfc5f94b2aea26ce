//! # Session State
//!
//! Per-block state shared by both execution strategies:
//!
//! ```text
//! OPEN ──append──► OPEN ──proof──► VERIFIED
//!   │                         └──► INVALID_HASH_OR_SIGNATURE
//!   └── malformed item / wrong proof ──► ERROR
//! ```
//!
//! The strategies differ only in *where* leaves and roots are hashed. Once
//! terminal, the state ignores further input and never touches the metrics
//! again.

use std::sync::Arc;
use std::time::Instant;

use bn_telemetry::BlockNodeMetrics;
use shared_crypto::SignatureVerifier;
use shared_types::{
    hash_hex, BlockHash, BlockHeader, BlockItem, BlockProof, BlockVerificationStatus,
    MerkleTreeInfo, VerificationResult,
};
use tracing::{debug, info, warn};

use crate::domain::accumulator::{BlockAccumulator, Leaf};
use crate::domain::errors::VerificationError;
use crate::domain::merkle::compute_block_hash;
use crate::domain::result::{result_channel, ResultResolver, SessionOutcome, VerificationResultHandle};

pub struct SessionState {
    header: BlockHeader,
    accumulator: BlockAccumulator,
    verifier: Arc<dyn SignatureVerifier>,
    metrics: Arc<BlockNodeMetrics>,
    resolver: ResultResolver,
    started: Instant,
}

impl SessionState {
    pub fn new(
        header: BlockHeader,
        verifier: Arc<dyn SignatureVerifier>,
        metrics: Arc<BlockNodeMetrics>,
    ) -> (Self, VerificationResultHandle) {
        let (resolver, handle) = result_channel(header.number);
        metrics.verification_blocks_received.inc();
        debug!(block_number = header.number, "Verification session opened");
        let state = Self {
            header,
            accumulator: BlockAccumulator::default(),
            verifier,
            metrics,
            resolver,
            started: Instant::now(),
        };
        (state, handle)
    }

    pub fn block_number(&self) -> u64 {
        self.header.number
    }

    pub fn is_terminated(&self) -> bool {
        self.resolver.is_resolved()
    }

    pub fn accumulator(&self) -> &BlockAccumulator {
        &self.accumulator
    }

    pub fn add_leaves(&mut self, leaves: Vec<Leaf>) {
        if !self.is_terminated() {
            self.accumulator.extend(leaves);
        }
    }

    /// Parse the closing proof and check it belongs to this block.
    pub fn open_proof(&self, item: &BlockItem) -> Result<BlockProof, VerificationError> {
        let proof = item
            .block_proof()
            .map_err(|e| VerificationError::MalformedItem {
                block_number: self.header.number,
                reason: e.to_string(),
            })?;
        if proof.block != self.header.number {
            return Err(VerificationError::ProofMismatch {
                expected: self.header.number,
                found: proof.block,
            });
        }
        Ok(proof)
    }

    /// Derive the block hash from the subtree roots and check the signature.
    pub fn conclude(
        &self,
        proof: &BlockProof,
        input_root: BlockHash,
        output_root: BlockHash,
    ) -> VerificationResult {
        let block_hash = compute_block_hash(
            &proof.previous_block_root_hash,
            &input_root,
            &output_root,
            &proof.start_of_block_state_root_hash,
        );
        let status = if self.verifier.verify(&block_hash, &proof.block_signature) {
            BlockVerificationStatus::Verified
        } else {
            BlockVerificationStatus::InvalidHashOrSignature
        };
        let info = MerkleTreeInfo {
            input_tree_leaves: self.accumulator.input_leaves().to_vec(),
            output_tree_leaves: self.accumulator.output_leaves().to_vec(),
            previous_block_root_hash: proof.previous_block_root_hash,
            start_of_block_state_root_hash: proof.start_of_block_state_root_hash,
            block_hash,
        };
        VerificationResult::computed(self.header.number, status, info)
    }

    /// Resolve the session. Metrics are recorded only by the call that
    /// actually terminates it.
    pub fn complete(&self, outcome: SessionOutcome) {
        let block_number = self.header.number;
        let summary = match &outcome {
            Ok(result) => Ok((result.status, result.block_hash)),
            Err(e) => Err(e.clone()),
        };
        if !self.resolver.resolve(outcome) {
            return;
        }

        self.metrics
            .verification_block_time
            .observe(self.started.elapsed().as_secs_f64());
        match summary {
            Ok((BlockVerificationStatus::Verified, hash)) => {
                self.metrics.verification_blocks_verified.inc();
                info!(
                    block_number,
                    block_hash = %hash.as_ref().map(hash_hex).unwrap_or_default(),
                    leaves = self.accumulator.leaf_count(),
                    "Block verified"
                );
            }
            Ok((status, _)) => {
                self.metrics.verification_blocks_failed.inc();
                warn!(block_number, %status, "Block failed verification");
            }
            Err(e) => {
                self.metrics.verification_blocks_error.inc();
                warn!(block_number, error = %e, "Block verification error");
            }
        }
    }
}
