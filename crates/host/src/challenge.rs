//! Execution challenge: cuts, divergence search, bisection and one-step proofs

use tracing::{debug, info, warn};
use xlayer_dispute_core::{
    Bisection, ChallengeSegment, ExecutionCursor, ExecutionCut, ExecutionSession, InboxDeltaTable,
    MachineSnapshot, Offset, ReplayEngine,
};

use crate::cancel::CancelToken;
use crate::client::{BisectionMove, DisputeClient, OneStepProofMove, TxRef};
use crate::error::{ChallengeError, InvariantViolation};

/// Outcome of comparing claimed cuts against replayed ones
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Divergence {
    /// Cut `i` is the first wrong one; cut `i - 1` is agreed
    Found(usize),
    /// The segment's starting cut, which must be agreed, is wrong
    FirstCutMismatch,
    /// Every claimed cut matches the local replay
    NoDivergence,
}

/// One party's view of a challenged execution
#[derive(Clone, Debug)]
pub struct ExecutionChallenge {
    /// Start of the challenged assertion; all offsets are relative to it
    initial_cursor: ExecutionCursor,
    inbox_delta: InboxDeltaTable,
    go_over_gas: bool,
}

impl ExecutionChallenge {
    /// Challenge replaying from `initial_cursor`, overshooting gas targets by default
    pub fn new(initial_cursor: ExecutionCursor, inbox_delta: InboxDeltaTable) -> Self {
        Self {
            initial_cursor,
            inbox_delta,
            go_over_gas: true,
        }
    }

    /// Whether the instruction crossing a gas target is executed
    pub fn with_go_over_gas(mut self, go_over_gas: bool) -> Self {
        self.go_over_gas = go_over_gas;
        self
    }

    /// Cursor replay starts from
    pub fn initial_cursor(&self) -> &ExecutionCursor {
        &self.initial_cursor
    }

    fn open_session<E: ReplayEngine>(
        &self,
        engine: &E,
        offsets: &[Offset],
    ) -> Result<E::Session, ChallengeError> {
        engine
            .new_session(&self.initial_cursor, self.go_over_gas, offsets)
            .map_err(|source| ChallengeError::Replay {
                offset: offsets.first().copied().unwrap_or_default(),
                source,
            })
    }

    fn cut_at<S: ExecutionSession>(
        &self,
        session: &mut S,
        offset: Offset,
    ) -> Result<ExecutionCut, ChallengeError> {
        let info = session
            .info_at(offset)
            .map_err(|source| ChallengeError::Replay { offset, source })?;
        let inbox_delta = self
            .inbox_delta
            .digest_at(info.inbox_messages_read)
            .map_err(|source| ChallengeError::AccumulatorBounds { offset, source })?;
        Ok(ExecutionCut::from_info(&info, inbox_delta))
    }

    /// Cuts at `offsets`, in order, from a single replay session
    pub fn get_cuts<E: ReplayEngine>(
        &self,
        engine: &E,
        offsets: &[Offset],
    ) -> Result<Vec<ExecutionCut>, ChallengeError> {
        let mut session = self.open_session(engine, offsets)?;
        offsets
            .iter()
            .map(|offset| self.cut_at(&mut session, *offset))
            .collect()
    }

    /// Replay through `offsets` and compare against `claimed` by cut hash.
    ///
    /// Replay stops at the first mismatch.
    pub fn locate_divergence<E: ReplayEngine>(
        &self,
        engine: &E,
        offsets: &[Offset],
        claimed: &[ExecutionCut],
    ) -> Result<Divergence, ChallengeError> {
        if offsets.len() != claimed.len() {
            return Err(InvariantViolation::LengthMismatch {
                offsets: offsets.len(),
                cuts: claimed.len(),
            }
            .into());
        }

        let mut session = self.open_session(engine, offsets)?;
        for (i, (offset, claimed_cut)) in offsets.iter().zip(claimed).enumerate() {
            let cut = self.cut_at(&mut session, *offset)?;
            if cut.cut_hash() != claimed_cut.cut_hash() {
                debug!("Claimed cut {} at offset {} diverges", i, offset);
                if i == 0 {
                    return Ok(Divergence::FirstCutMismatch);
                }
                return Ok(Divergence::Found(i));
            }
        }
        Ok(Divergence::NoDivergence)
    }

    /// Index of the first wrong claimed cut.
    ///
    /// A wrong first cut or no wrong cut at all is an invariant violation:
    /// the segment start is agreed by construction, and this is only called
    /// once a disagreement inside the segment is known.
    pub fn find_first_divergence<E: ReplayEngine>(
        &self,
        engine: &E,
        offsets: &[Offset],
        claimed: &[ExecutionCut],
    ) -> Result<usize, ChallengeError> {
        match self.locate_divergence(engine, offsets, claimed)? {
            Divergence::Found(index) => Ok(index),
            Divergence::FirstCutMismatch => {
                warn!("First cut at offset {:?} already wrong", offsets.first());
                Err(InvariantViolation::FirstCutMismatch.into())
            }
            Divergence::NoDivergence => Err(InvariantViolation::NoDivergence {
                checked: offsets.len(),
            }
            .into()),
        }
    }

    /// Submit a subdivision of `segment_index` with freshly computed cuts.
    ///
    /// `segment` must lie within the previous bisection's sub-segment at
    /// `segment_index`.
    pub async fn bisect<C: DisputeClient + ?Sized>(
        &self,
        cancel: &CancelToken,
        client: &C,
        prev_bisection: &Bisection,
        segment_index: usize,
        segment: ChallengeSegment,
        sub_cuts: Vec<ExecutionCut>,
    ) -> Result<TxRef, ChallengeError> {
        check_segment(prev_bisection, segment_index, segment)?;
        if cancel.is_cancelled() {
            return Err(ChallengeError::Cancelled);
        }

        info!(
            "Bisecting segment {} [{}, {}) into {} parts",
            segment_index,
            segment.start,
            segment.end()?,
            sub_cuts.len().saturating_sub(1)
        );
        client
            .submit_bisection(
                cancel,
                BisectionMove {
                    prev_bisection: prev_bisection.clone(),
                    segment_index,
                    segment,
                    sub_cuts,
                },
            )
            .await
            .map_err(|source| ChallengeError::Submission {
                segment_index,
                source,
            })
    }

    /// Prove the single step at `segment.start`.
    ///
    /// Everything is built before anything is submitted: if the execution
    /// info, the snapshot or either proof cannot be produced, the client is
    /// never called.
    pub async fn one_step_proof<E: ReplayEngine, C: DisputeClient + ?Sized>(
        &self,
        cancel: &CancelToken,
        client: &C,
        engine: &E,
        prev_bisection: &Bisection,
        segment_index: usize,
        segment: ChallengeSegment,
    ) -> Result<TxRef, ChallengeError> {
        check_segment(prev_bisection, segment_index, segment)?;

        let offset = segment.start;
        let proof = {
            let mut session = self.open_session(engine, &[offset])?;
            let replay_err = |source| ChallengeError::Replay { offset, source };

            let execution_info = session.info_at(offset).map_err(replay_err)?;
            let machine = session.machine_at(offset).map_err(replay_err)?;
            let machine_proof = machine.marshal_for_proof().map_err(replay_err)?;
            let buffer_proof = machine.marshal_buffer_proof().map_err(replay_err)?;
            let inbox_delta = self
                .inbox_delta
                .digest_at(execution_info.inbox_messages_read)
                .map_err(|source| ChallengeError::AccumulatorBounds { offset, source })?;

            OneStepProofMove {
                prev_bisection: prev_bisection.clone(),
                segment_index,
                execution_info,
                inbox_delta,
                machine_proof,
                buffer_proof,
            }
        };

        if cancel.is_cancelled() {
            return Err(ChallengeError::Cancelled);
        }

        info!(
            "Submitting one-step proof for segment {} at offset {}",
            segment_index, offset
        );
        client
            .submit_one_step_proof(cancel, proof)
            .await
            .map_err(|source| ChallengeError::Submission {
                segment_index,
                source,
            })
    }
}

/// `segment` must lie within the sub-segment `bisection` records at `index`
fn check_segment(
    bisection: &Bisection,
    index: usize,
    segment: ChallengeSegment,
) -> Result<(), ChallengeError> {
    let expected = bisection.sub_segment(index)?;
    if segment.start < expected.start || segment.end()? > expected.end()? {
        return Err(InvariantViolation::SegmentMismatch {
            index,
            expected,
            claimed: segment,
        }
        .into());
    }
    Ok(())
}
