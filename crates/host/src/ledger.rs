//! In-memory dispute ledger for testing without an L1 node

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;
use xlayer_dispute_core::{keccak256, u256_word, Bisection};

use crate::cancel::CancelToken;
use crate::client::{BisectionMove, DisputeClient, OneStepProofMove, SubmissionError, TxRef};

#[derive(Debug, Default)]
struct LedgerState {
    current: Option<Bisection>,
    bisections: Vec<BisectionMove>,
    proofs: Vec<OneStepProofMove>,
    nonce: u64,
    reject_next: Option<String>,
}

impl LedgerState {
    fn next_tx(&mut self, kind: &[u8]) -> Result<TxRef, SubmissionError> {
        if let Some(reason) = self.reject_next.take() {
            return Err(SubmissionError::Rejected(reason));
        }
        self.nonce += 1;
        Ok(TxRef(keccak256(&[kind, &u256_word(self.nonce)])))
    }
}

/// Dispute client that applies moves to a local copy of the challenge state.
///
/// Submissions are accepted immediately: the returned reference is final.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    /// Ledger with no open challenge
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger for a challenge opened against `bisection`
    pub fn with_bisection(bisection: Bisection) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                current: Some(bisection),
                ..LedgerState::default()
            }),
        }
    }

    /// Latest bisection recorded on the ledger
    pub async fn current_bisection(&self) -> Option<Bisection> {
        self.state.lock().await.current.clone()
    }

    /// Accepted bisection moves, oldest first
    pub async fn bisections(&self) -> Vec<BisectionMove> {
        self.state.lock().await.bisections.clone()
    }

    /// Accepted one-step proofs
    pub async fn proofs(&self) -> Vec<OneStepProofMove> {
        self.state.lock().await.proofs.clone()
    }

    /// Number of accepted submissions
    pub async fn submission_count(&self) -> u64 {
        self.state.lock().await.nonce
    }

    /// Make the next submission fail as a reverted transaction
    pub async fn reject_next(&self, reason: impl Into<String>) {
        self.state.lock().await.reject_next = Some(reason.into());
    }
}

#[async_trait]
impl DisputeClient for InMemoryLedger {
    async fn submit_bisection(
        &self,
        cancel: &CancelToken,
        bisection: BisectionMove,
    ) -> Result<TxRef, SubmissionError> {
        if cancel.is_cancelled() {
            return Err(SubmissionError::Cancelled);
        }

        let mut state = self.state.lock().await;
        let tx = state.next_tx(b"bisect")?;
        info!(
            "Ledger: segment {} at {} (length {}) bisected into {} parts, tx={}",
            bisection.segment_index,
            bisection.segment.start,
            bisection.segment.length,
            bisection.sub_cuts.len().saturating_sub(1),
            tx
        );
        state.current = Some(Bisection::new(bisection.segment, bisection.sub_cuts.clone()));
        state.bisections.push(bisection);
        Ok(tx)
    }

    async fn submit_one_step_proof(
        &self,
        cancel: &CancelToken,
        proof: OneStepProofMove,
    ) -> Result<TxRef, SubmissionError> {
        if cancel.is_cancelled() {
            return Err(SubmissionError::Cancelled);
        }

        let mut state = self.state.lock().await;
        let tx = state.next_tx(b"one-step")?;
        info!(
            "Ledger: one-step proof for segment {} ({} + {} proof bytes), tx={}",
            proof.segment_index,
            proof.machine_proof.len(),
            proof.buffer_proof.len(),
            tx
        );
        state.proofs.push(proof);
        Ok(tx)
    }
}
