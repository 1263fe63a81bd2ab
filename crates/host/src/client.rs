//! Dispute contract client interface

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use xlayer_dispute_core::{Bisection, ChallengeSegment, ExecutionCut, ExecutionInfo, Hash};

use crate::cancel::CancelToken;

/// Handle of a submitted, not yet confirmed, transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxRef(pub Hash);

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Subdivision of one segment of the current bisection
#[derive(Clone, Debug)]
pub struct BisectionMove {
    /// Bisection being responded to
    pub prev_bisection: Bisection,
    /// Index of the disputed sub-segment
    pub segment_index: usize,
    /// The disputed sub-segment
    pub segment: ChallengeSegment,
    /// Cuts at every boundary of the new subdivision, endpoints included
    pub sub_cuts: Vec<ExecutionCut>,
}

/// One-step proof of a segment of the current bisection
#[derive(Clone, Debug)]
pub struct OneStepProofMove {
    /// Bisection the proof resolves
    pub prev_bisection: Bisection,
    /// Index of the one-step sub-segment
    pub segment_index: usize,
    /// Execution info at the step's start
    pub execution_info: ExecutionInfo,
    /// Inbox delta at the step's start
    pub inbox_delta: Hash,
    /// Serialized machine state for the step
    pub machine_proof: Vec<u8>,
    /// Serialized side buffer
    pub buffer_proof: Vec<u8>,
}

/// Transaction submission failed
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Cancelled before the move was confirmed
    #[error("submission cancelled")]
    Cancelled,

    /// The contract or node refused the move
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// The node could not be reached or answered garbage
    #[error("transport error: {0}")]
    Transport(#[from] anyhow::Error),
}

/// Capability to submit moves against the on-chain challenge.
///
/// Retry and nonce management, if any, belong to the implementation.
#[async_trait]
pub trait DisputeClient: Send + Sync {
    /// Submit a bisection and wait until it is accepted
    async fn submit_bisection(
        &self,
        cancel: &CancelToken,
        bisection: BisectionMove,
    ) -> Result<TxRef, SubmissionError>;

    /// Submit a one-step proof and wait until it is accepted
    async fn submit_one_step_proof(
        &self,
        cancel: &CancelToken,
        proof: OneStepProofMove,
    ) -> Result<TxRef, SubmissionError>;
}
