//! Challenge segments and the bisection record

use serde::{Deserialize, Serialize};
use crate::cut::ExecutionCut;
use crate::error::SegmentError;
use crate::types::{Hash, Offset};

/// Half-open range `[start, start + length)` of offsets under dispute.
///
/// Segments arrive from the opponent, so every derived offset is checked:
/// a segment whose end does not fit in an [`Offset`] is rejected with
/// [`SegmentError::Overflow`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeSegment {
    /// First offset in the segment
    pub start: Offset,
    /// Number of gas units covered
    pub length: u64,
}

impl ChallengeSegment {
    /// Segment of `length` gas units starting at `start`
    pub fn new(start: Offset, length: u64) -> Self {
        Self { start, length }
    }

    /// First offset past the segment
    pub fn end(&self) -> Result<Offset, SegmentError> {
        self.start
            .checked_add(self.length)
            .ok_or(SegmentError::Overflow {
                start: self.start,
                length: self.length,
            })
    }

    /// Segment can no longer be subdivided
    pub fn is_one_step(&self) -> bool {
        self.length == 1
    }

    /// Split into at most `degree` consecutive chunks.
    ///
    /// The first chunk takes the remainder, the rest are `length / degree`
    /// wide. The degree is capped at the length so no chunk is empty.
    pub fn split(&self, degree: u64) -> Result<Vec<Self>, SegmentError> {
        // Every chunk start lies within [start, end]
        self.end()?;

        let degree = degree.min(self.length).max(1);
        let chunk = self.length / degree;
        let first = chunk + self.length % degree;

        let mut segments = Vec::with_capacity(degree as usize);
        segments.push(Self::new(self.start, first));
        let mut start = self.start + first;
        for _ in 1..degree {
            segments.push(Self::new(start, chunk));
            start += chunk;
        }
        Ok(segments)
    }

    /// Boundary offsets of `split(degree)`, both endpoints included
    pub fn boundaries(&self, degree: u64) -> Result<Vec<Offset>, SegmentError> {
        let mut offsets: Vec<Offset> = self.split(degree)?.iter().map(|s| s.start).collect();
        offsets.push(self.end()?);
        Ok(offsets)
    }
}

/// On-chain record of the latest subdivision of a segment.
///
/// `cuts` holds one cut per boundary, so a bisection into `n` segments
/// carries `n + 1` cuts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bisection {
    /// Segment that was subdivided
    pub challenged_segment: ChallengeSegment,
    /// Cuts at every boundary of the subdivision
    pub cuts: Vec<ExecutionCut>,
}

impl Bisection {
    /// Record a subdivision of `challenged_segment`
    pub fn new(challenged_segment: ChallengeSegment, cuts: Vec<ExecutionCut>) -> Self {
        Self {
            challenged_segment,
            cuts,
        }
    }

    /// Number of sub-segments
    pub fn segment_count(&self) -> usize {
        self.cuts.len().saturating_sub(1)
    }

    /// Offsets the cuts were taken at
    pub fn offsets(&self) -> Result<Vec<Offset>, SegmentError> {
        self.challenged_segment
            .boundaries(self.segment_count() as u64)
    }

    /// The `index`-th sub-segment
    pub fn sub_segment(&self, index: usize) -> Result<ChallengeSegment, SegmentError> {
        let count = self.segment_count();
        if index >= count {
            return Err(SegmentError::OutOfRange { index, count });
        }
        self.challenged_segment
            .split(count as u64)?
            .get(index)
            .copied()
            .ok_or(SegmentError::OutOfRange { index, count })
    }

    /// On-chain hashes of the cuts, in boundary order
    pub fn cut_hashes(&self) -> Vec<Hash> {
        self.cuts.iter().map(ExecutionCut::cut_hash).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ZERO_HASH;

    fn dummy_cut(gas_used: u64) -> ExecutionCut {
        ExecutionCut {
            gas_used,
            inbox_delta: ZERO_HASH,
            machine_state: ZERO_HASH,
            send_acc: ZERO_HASH,
            send_count: 0,
            log_acc: ZERO_HASH,
            log_count: 0,
        }
    }

    #[test]
    fn test_split_remainder_goes_first() {
        let segment = ChallengeSegment::new(100, 10);
        let parts = segment.split(3).unwrap();

        assert_eq!(
            parts,
            vec![
                ChallengeSegment::new(100, 4),
                ChallengeSegment::new(104, 3),
                ChallengeSegment::new(107, 3),
            ]
        );
        assert_eq!(segment.boundaries(3).unwrap(), vec![100, 104, 107, 110]);
    }

    #[test]
    fn test_split_capped_by_length() {
        let segment = ChallengeSegment::new(0, 2);
        let parts = segment.split(400).unwrap();

        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(ChallengeSegment::is_one_step));
    }

    #[test]
    fn test_bisection_offsets_and_segments() {
        let bisection = Bisection::new(
            ChallengeSegment::new(0, 200),
            vec![dummy_cut(0), dummy_cut(100), dummy_cut(200)],
        );

        assert_eq!(bisection.segment_count(), 2);
        assert_eq!(bisection.offsets().unwrap(), vec![0, 100, 200]);
        assert_eq!(bisection.sub_segment(1), Ok(ChallengeSegment::new(100, 100)));
        assert_eq!(
            bisection.sub_segment(2),
            Err(SegmentError::OutOfRange { index: 2, count: 2 })
        );
        assert_eq!(bisection.cut_hashes().len(), 3);
    }

    #[test]
    fn test_segment_end_overflow() {
        let segment = ChallengeSegment::new(u64::MAX - 1, 10);
        let overflow = SegmentError::Overflow {
            start: u64::MAX - 1,
            length: 10,
        };

        assert_eq!(segment.end(), Err(overflow));
        assert_eq!(segment.split(4), Err(overflow));
        assert_eq!(segment.boundaries(4), Err(overflow));

        let bisection = Bisection::new(segment, vec![dummy_cut(0), dummy_cut(5), dummy_cut(10)]);
        assert_eq!(bisection.offsets(), Err(overflow));
        assert_eq!(bisection.sub_segment(0), Err(overflow));
    }

    #[test]
    fn test_segment_ending_at_max_offset() {
        let segment = ChallengeSegment::new(u64::MAX - 10, 10);
        assert_eq!(segment.end(), Ok(u64::MAX));
        assert_eq!(
            segment.boundaries(2).unwrap(),
            vec![u64::MAX - 10, u64::MAX - 5, u64::MAX]
        );
    }
}
