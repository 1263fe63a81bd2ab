//! Challenger logic: one response to the opponent's latest bisection

use tracing::info;
use xlayer_dispute_core::{Bisection, ChallengeSegment, ReplayEngine};

use crate::cancel::CancelToken;
use crate::challenge::ExecutionChallenge;
use crate::client::{DisputeClient, TxRef};
use crate::config::ChallengerConfig;
use crate::error::ChallengeError;

/// Move submitted in response to a bisection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Move {
    /// The disputed segment was split further
    Bisected {
        /// Index of the disputed sub-segment
        segment_index: usize,
        /// The disputed sub-segment
        segment: ChallengeSegment,
        /// Submission transaction
        tx: TxRef,
    },
    /// The disputed segment was one step wide and has been proven
    OneStepProof {
        /// Index of the proven sub-segment
        segment_index: usize,
        /// The proven sub-segment
        segment: ChallengeSegment,
        /// Submission transaction
        tx: TxRef,
    },
}

impl Move {
    /// Transaction that carried the move
    pub fn tx(&self) -> TxRef {
        match self {
            Self::Bisected { tx, .. } | Self::OneStepProof { tx, .. } => *tx,
        }
    }
}

/// Responds to the opponent's bisections until the dispute is one step wide
#[derive(Clone, Debug)]
pub struct Challenger {
    name: String,
    challenge: ExecutionChallenge,
    bisection_degree: u64,
}

impl Challenger {
    /// Create a challenger splitting segments into `bisection_degree` parts (at least 2)
    pub fn new(name: impl Into<String>, challenge: ExecutionChallenge, bisection_degree: u64) -> Self {
        Self {
            name: name.into(),
            challenge,
            bisection_degree: bisection_degree.max(2),
        }
    }

    /// Create a challenger using the configured degree and replay mode
    pub fn from_config(name: impl Into<String>, challenge: ExecutionChallenge, config: &ChallengerConfig) -> Self {
        Self::new(
            name,
            challenge.with_go_over_gas(config.go_over_gas),
            config.bisection_degree,
        )
    }

    /// Name used in log lines
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The challenge this party replays
    pub fn challenge(&self) -> &ExecutionChallenge {
        &self.challenge
    }

    /// Find the first segment of `bisection` we disagree with, then either
    /// bisect it or, if it is one step wide, prove it.
    pub async fn respond<E: ReplayEngine, C: DisputeClient + ?Sized>(
        &self,
        cancel: &CancelToken,
        client: &C,
        engine: &E,
        bisection: &Bisection,
    ) -> Result<Move, ChallengeError> {
        let offsets = bisection.offsets()?;
        let divergence = self
            .challenge
            .find_first_divergence(engine, &offsets, &bisection.cuts)?;

        let segment_index = divergence - 1;
        let segment = bisection.sub_segment(segment_index)?;

        info!(
            "[{}] Disagree with cut {} at offset {}, disputing segment {} [{}, {})",
            self.name,
            divergence,
            offsets[divergence],
            segment_index,
            segment.start,
            segment.end()?
        );

        if segment.is_one_step() {
            let tx = self
                .challenge
                .one_step_proof(cancel, client, engine, bisection, segment_index, segment)
                .await?;
            return Ok(Move::OneStepProof {
                segment_index,
                segment,
                tx,
            });
        }

        let sub_offsets = segment.boundaries(self.bisection_degree)?;
        let sub_cuts = self.challenge.get_cuts(engine, &sub_offsets)?;
        let tx = self
            .challenge
            .bisect(cancel, client, bisection, segment_index, segment, sub_cuts)
            .await?;
        Ok(Move::Bisected {
            segment_index,
            segment,
            tx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvariantViolation;
    use crate::ledger::InMemoryLedger;
    use xlayer_dispute_core::{InboxDeltaTable, Instruction, MachineReplayEngine, StepMachine};

    fn party(program: Vec<Instruction>, degree: u64) -> (Challenger, MachineReplayEngine<StepMachine>) {
        let inbox = vec![b"deposit".to_vec()];
        let table = InboxDeltaTable::from_messages(&inbox);
        let mut engine = MachineReplayEngine::new();
        let cursor = engine.insert_checkpoint(StepMachine::new(program, inbox)).unwrap();
        (Challenger::new("party", ExecutionChallenge::new(cursor, table), degree), engine)
    }

    fn honest_program() -> Vec<Instruction> {
        let mut program = vec![Instruction::ReadInbox];
        for i in 0..500u64 {
            program.push(match i % 4 {
                0 => Instruction::Add(i),
                1 => Instruction::Mul(3),
                2 => Instruction::Log,
                _ => Instruction::BufferWrite((i % 16) as u16),
            });
        }
        program.push(Instruction::Send);
        program
    }

    #[tokio::test]
    async fn test_full_game_reaches_one_step_proof() {
        let honest = honest_program();
        let mut faulty = honest.clone();
        faulty[321] = Instruction::Add(1_000_000);

        let (challenger, honest_engine) = party(honest.clone(), 4);
        let (asserter, faulty_engine) = party(faulty, 4);

        let total_gas = StepMachine::new(honest, vec![]).total_gas();
        let segment = ChallengeSegment::new(0, total_gas);
        let claimed = asserter
            .challenge()
            .get_cuts(&faulty_engine, &segment.boundaries(1).unwrap())
            .unwrap();
        let ledger = InMemoryLedger::with_bisection(Bisection::new(segment, claimed));
        let cancel = CancelToken::new();

        let mut rounds = 0;
        let last = loop {
            let bisection = ledger.current_bisection().await.unwrap();
            let (party, engine) = if rounds % 2 == 0 {
                (&challenger, &honest_engine)
            } else {
                (&asserter, &faulty_engine)
            };
            let mv = party.respond(&cancel, &ledger, engine, &bisection).await.unwrap();
            rounds += 1;
            if let Move::OneStepProof { .. } = mv {
                break mv;
            }
            assert!(rounds < 64, "game did not converge");
        };

        assert!(matches!(last, Move::OneStepProof { segment, .. } if segment.is_one_step()));
        assert_eq!(ledger.proofs().await.len(), 1);
        assert_eq!(ledger.bisections().await.len() as u64 + 1, ledger.submission_count().await);
    }

    #[tokio::test]
    async fn test_agreeing_bisection_is_invariant_violation() {
        let (challenger, engine) = party(honest_program(), 4);
        let segment = ChallengeSegment::new(0, 100);
        let cuts = challenger.challenge().get_cuts(&engine, &segment.boundaries(4).unwrap()).unwrap();
        let ledger = InMemoryLedger::new();

        let err = challenger
            .respond(&CancelToken::new(), &ledger, &engine, &Bisection::new(segment, cuts))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ChallengeError::InvariantViolation(InvariantViolation::NoDivergence { checked: 5 })
        ));
        assert_eq!(ledger.submission_count().await, 0);
    }

    #[tokio::test]
    async fn test_overflowing_bisection_is_invariant_violation() {
        let (challenger, engine) = party(honest_program(), 4);
        let cut = challenger.challenge().get_cuts(&engine, &[0]).unwrap().remove(0);
        let bisection = Bisection::new(
            ChallengeSegment::new(u64::MAX - 1, 10),
            vec![cut.clone(), cut.clone(), cut],
        );
        let ledger = InMemoryLedger::new();

        let err = challenger
            .respond(&CancelToken::new(), &ledger, &engine, &bisection)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ChallengeError::InvariantViolation(InvariantViolation::SegmentOverflow {
                start,
                length: 10,
            }) if start == u64::MAX - 1
        ));
        assert_eq!(ledger.submission_count().await, 0);
    }
}
