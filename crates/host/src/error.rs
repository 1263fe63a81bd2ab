//! Challenge error types

use thiserror::Error;
use xlayer_dispute_core::{AccumulatorBoundsError, ChallengeSegment, Offset, ReplayError, SegmentError};

use crate::client::SubmissionError;

/// Broken protocol invariant: a bug on one side, not a normal game step
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The segment's starting cut is wrong
    #[error("first cut of the segment disagrees with the pre-agreed commitment")]
    FirstCutMismatch,

    /// Every claimed cut matched the local replay
    #[error("no divergence found across {checked} checkpoints")]
    NoDivergence {
        /// Cuts compared
        checked: usize,
    },

    /// Offsets and claimed cuts differ in number
    #[error("{offsets} offsets but {cuts} claimed cuts")]
    LengthMismatch {
        /// Number of offsets
        offsets: usize,
        /// Number of claimed cuts
        cuts: usize,
    },

    /// Segment index outside the bisection
    #[error("segment {index} does not exist in a bisection of {count} segments")]
    SegmentOutOfRange {
        /// Requested index
        index: usize,
        /// Number of sub-segments
        count: usize,
    },

    /// Segment end does not fit in an offset
    #[error("segment starting at {start} with length {length} overflows")]
    SegmentOverflow {
        /// Segment start
        start: Offset,
        /// Segment length
        length: u64,
    },

    /// Segment passed with an index lies outside the bisection's sub-segment there
    #[error("{claimed:?} is not within segment {index} {expected:?}")]
    SegmentMismatch {
        /// Sub-segment index
        index: usize,
        /// Sub-segment recorded by the bisection
        expected: ChallengeSegment,
        /// Segment passed in
        claimed: ChallengeSegment,
    },
}

impl From<SegmentError> for InvariantViolation {
    fn from(err: SegmentError) -> Self {
        match err {
            SegmentError::Overflow { start, length } => Self::SegmentOverflow { start, length },
            SegmentError::OutOfRange { index, count } => Self::SegmentOutOfRange { index, count },
        }
    }
}

/// Failure of a challenge operation
#[derive(Debug, Error)]
pub enum ChallengeError {
    /// The replay engine failed
    #[error("replay failed at offset {offset}: {source}")]
    Replay {
        /// Offset being replayed
        offset: Offset,
        /// Engine error
        #[source]
        source: ReplayError,
    },

    /// The inbox delta table does not cover the messages read
    #[error("inbox delta lookup failed at offset {offset}: {source}")]
    AccumulatorBounds {
        /// Offset whose cut needed the digest
        offset: Offset,
        /// Table lookup error
        #[source]
        source: AccumulatorBoundsError,
    },

    /// A protocol invariant does not hold
    #[error("protocol invariant violated: {0}")]
    InvariantViolation(#[from] InvariantViolation),

    /// The dispute client did not accept the move
    #[error("submission failed for segment {segment_index}: {source}")]
    Submission {
        /// Segment the move was for
        segment_index: usize,
        /// Client error
        #[source]
        source: SubmissionError,
    },

    /// The move was cancelled before submission
    #[error("challenge move cancelled")]
    Cancelled,
}

impl From<SegmentError> for ChallengeError {
    fn from(err: SegmentError) -> Self {
        Self::InvariantViolation(err.into())
    }
}
