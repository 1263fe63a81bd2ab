//! Error types

use thiserror::Error;
use crate::types::{Hash, Offset};

/// The replay engine could not produce execution info or state
#[derive(Debug, Error)]
pub enum ReplayError {
    /// No checkpoint is stored under the cursor's machine hash
    #[error("no checkpoint stored for machine 0x{}", hex::encode(.0))]
    UnknownCursor(Hash),

    /// A different machine is already stored under the same hash
    #[error("checkpoint 0x{} already holds a different machine", hex::encode(.0))]
    CheckpointConflict(Hash),

    /// Execution halted before reaching the offset
    #[error("offset {offset} is beyond the trace, execution halted at {reached}")]
    BeyondTrace {
        /// Requested offset
        offset: Offset,
        /// Gas used when the machine halted
        reached: Offset,
    },

    /// Offsets went backwards within one session
    #[error("offset {offset} requested after offset {previous}")]
    OutOfOrder {
        /// Requested offset
        offset: Offset,
        /// Latest offset requested before it
        previous: Offset,
    },

    /// Machine asked for at an offset the session was not opened with
    #[error("offset {offset} was not requested when the session was opened")]
    NotRequested {
        /// Requested offset
        offset: Offset,
    },

    /// A proof payload could not be serialized
    #[error("failed to marshal {what}: {reason}")]
    Marshal {
        /// Payload being serialized
        what: &'static str,
        /// Underlying failure
        reason: String,
    },
}

/// Requested inbox message count is not covered by the inbox delta table
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("inbox delta table has {len} entries, no digest for {count} messages read")]
pub struct AccumulatorBoundsError {
    /// Messages read
    pub count: u64,
    /// Entries in the table
    pub len: usize,
}

/// Segment data that cannot describe a valid range of offsets
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SegmentError {
    /// `start + length` does not fit in an offset
    #[error("segment [{start}, {start} + {length}) overflows")]
    Overflow {
        /// Segment start
        start: Offset,
        /// Segment length
        length: u64,
    },

    /// Sub-segment index outside the bisection
    #[error("segment index {index} out of range, bisection has {count} segments")]
    OutOfRange {
        /// Requested index
        index: usize,
        /// Number of sub-segments
        count: usize,
    },
}
