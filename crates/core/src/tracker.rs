//! Session-scoped replay over a [`Machine`]

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::engine::{ExecutionSession, Machine, ReplayEngine};
use crate::error::ReplayError;
use crate::execution::{ExecutionCursor, ExecutionInfo};
use crate::types::{Hash, Offset};

/// Reference replay engine backed by stored machine checkpoints
#[derive(Clone, Debug, Default)]
pub struct MachineReplayEngine<M> {
    /// Checkpoints by machine hash
    checkpoints: HashMap<Hash, M>,
}

impl<M: Machine> MachineReplayEngine<M> {
    /// Engine with no checkpoints
    pub fn new() -> Self {
        Self {
            checkpoints: HashMap::new(),
        }
    }

    /// Store a checkpoint and return a cursor pointing at it.
    ///
    /// A cursor must keep resolving to the machine it was issued for, so a
    /// different machine with an already stored hash is refused. Storing the
    /// same machine again returns the same cursor.
    pub fn insert_checkpoint(&mut self, machine: M) -> Result<ExecutionCursor, ReplayError>
    where
        M: PartialEq,
    {
        let hash = machine.hash();
        match self.checkpoints.entry(hash) {
            Entry::Occupied(entry) if *entry.get() != machine => {
                return Err(ReplayError::CheckpointConflict(hash));
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(entry) => {
                entry.insert(machine);
            }
        }
        Ok(ExecutionCursor::new(hash))
    }
}

impl<M: Machine> ReplayEngine for MachineReplayEngine<M> {
    type Session = ExecutionTracker<M>;

    fn new_session(
        &self,
        cursor: &ExecutionCursor,
        go_over_gas: bool,
        offsets: &[Offset],
    ) -> Result<Self::Session, ReplayError> {
        let machine = self
            .checkpoints
            .get(&cursor.machine_hash)
            .cloned()
            .ok_or(ReplayError::UnknownCursor(cursor.machine_hash))?;
        ExecutionTracker::new(machine, go_over_gas, offsets)
    }
}

/// Replays one machine forward through a sorted list of offsets.
///
/// Every offset reached is cached, so asking for the info and then the
/// machine at the same offset replays once. Offsets only move forward, which
/// means the machine always stands at the latest requested offset: snapshots
/// are cloned from it on demand and never stored.
#[derive(Clone, Debug)]
pub struct ExecutionTracker<M> {
    machine: M,
    /// Info at the machine's current position
    current: ExecutionInfo,
    go_over_gas: bool,
    offsets: Vec<Offset>,
    cache: BTreeMap<Offset, ExecutionInfo>,
    last_requested: Option<Offset>,
}

impl<M: Machine> ExecutionTracker<M> {
    /// Open a session. `offsets` must be sorted ascending.
    pub fn new(machine: M, go_over_gas: bool, offsets: &[Offset]) -> Result<Self, ReplayError> {
        if let Some(pair) = offsets.windows(2).find(|pair| pair[1] < pair[0]) {
            return Err(ReplayError::OutOfOrder {
                offset: pair[1],
                previous: pair[0],
            });
        }

        let current = ExecutionInfo::start(machine.hash());
        Ok(Self {
            machine,
            current,
            go_over_gas,
            offsets: offsets.to_vec(),
            cache: BTreeMap::new(),
            last_requested: None,
        })
    }

    /// Number of distinct offsets replayed so far
    pub fn cached_offsets(&self) -> usize {
        self.cache.len()
    }

    fn step_to(&mut self, offset: Offset) -> Result<&ExecutionInfo, ReplayError> {
        if let Some(previous) = self.last_requested.filter(|previous| offset < *previous) {
            return Err(ReplayError::OutOfOrder { offset, previous });
        }
        self.last_requested = Some(offset);

        if !self.cache.contains_key(&offset) {
            // With go_over_gas the machine may already stand past `offset`
            if self.current.gas_used < offset {
                let budget = offset - self.current.gas_used;
                let assertion = self.machine.execute(budget, self.go_over_gas);
                self.current.apply(&assertion, self.machine.hash());
                debug!(
                    "Replayed {} gas to offset {} (total {})",
                    assertion.gas_used, offset, self.current.gas_used
                );

                if self.current.gas_used < offset && self.machine.is_halted() {
                    return Err(ReplayError::BeyondTrace {
                        offset,
                        reached: self.current.gas_used,
                    });
                }
            }
            self.cache.insert(offset, self.current.clone());
        }

        Ok(&self.cache[&offset])
    }
}

impl<M: Machine> ExecutionSession for ExecutionTracker<M> {
    type Snapshot = M;

    fn info_at(&mut self, offset: Offset) -> Result<ExecutionInfo, ReplayError> {
        self.step_to(offset).cloned()
    }

    fn machine_at(&mut self, offset: Offset) -> Result<M, ReplayError> {
        if self.offsets.binary_search(&offset).is_err() {
            return Err(ReplayError::NotRequested { offset });
        }
        self.step_to(offset)?;
        Ok(self.machine.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Instruction, StepMachine};

    fn test_machine() -> StepMachine {
        // 10 x Add(1): one gas each
        StepMachine::new(vec![Instruction::Add(1); 10], vec![])
    }

    fn engine() -> (MachineReplayEngine<StepMachine>, ExecutionCursor) {
        let mut engine = MachineReplayEngine::new();
        let cursor = engine.insert_checkpoint(test_machine()).unwrap();
        (engine, cursor)
    }

    #[test]
    fn test_info_at_sequential_offsets() {
        let (engine, cursor) = engine();
        let mut session = engine.new_session(&cursor, true, &[0, 4, 10]).unwrap();

        assert_eq!(session.info_at(0).unwrap().gas_used, 0);
        assert_eq!(session.info_at(4).unwrap().gas_used, 4);
        assert_eq!(session.info_at(10).unwrap().gas_used, 10);
        assert_eq!(session.cached_offsets(), 3);
    }

    #[test]
    fn test_repeated_offset_uses_cache() {
        let (engine, cursor) = engine();
        let mut session = engine.new_session(&cursor, true, &[5]).unwrap();

        let first = session.info_at(5).unwrap();
        let again = session.info_at(5).unwrap();
        assert_eq!(first, again);
        assert_eq!(session.cached_offsets(), 1);

        let machine = session.machine_at(5).unwrap();
        assert_eq!(machine.hash(), first.machine_hash);
    }

    #[test]
    fn test_out_of_order_request_rejected() {
        let (engine, cursor) = engine();
        let mut session = engine.new_session(&cursor, true, &[2, 6]).unwrap();

        session.info_at(6).unwrap();
        let err = session.info_at(2).unwrap_err();
        assert!(matches!(err, ReplayError::OutOfOrder { offset: 2, previous: 6 }));
    }

    #[test]
    fn test_unsorted_offsets_rejected() {
        let (engine, cursor) = engine();
        let err = engine.new_session(&cursor, true, &[0, 8, 3]).unwrap_err();
        assert!(matches!(err, ReplayError::OutOfOrder { offset: 3, previous: 8 }));
    }

    #[test]
    fn test_offset_beyond_trace() {
        let (engine, cursor) = engine();
        let mut session = engine.new_session(&cursor, true, &[11]).unwrap();

        let err = session.info_at(11).unwrap_err();
        assert!(matches!(err, ReplayError::BeyondTrace { offset: 11, reached: 10 }));
    }

    #[test]
    fn test_unknown_cursor() {
        let (engine, _) = engine();
        let err = engine
            .new_session(&ExecutionCursor::new([9u8; 32]), true, &[0])
            .unwrap_err();
        assert!(matches!(err, ReplayError::UnknownCursor(_)));
    }

    #[test]
    fn test_snapshot_only_for_requested_offsets() {
        let (engine, cursor) = engine();
        let mut session = engine.new_session(&cursor, true, &[3]).unwrap();

        session.info_at(2).unwrap();
        assert!(matches!(
            session.machine_at(2),
            Err(ReplayError::NotRequested { offset: 2 })
        ));
        assert_eq!(session.machine_at(3).unwrap().register(), 3);
    }

    #[test]
    fn test_snapshot_after_later_offset_rejected() {
        let (engine, cursor) = engine();
        let mut session = engine.new_session(&cursor, true, &[3, 7]).unwrap();

        session.info_at(3).unwrap();
        session.info_at(7).unwrap();
        assert!(matches!(
            session.machine_at(3),
            Err(ReplayError::OutOfOrder { offset: 3, previous: 7 })
        ));
        assert_eq!(session.machine_at(7).unwrap().register(), 7);
    }

    #[test]
    fn test_conflicting_checkpoint_rejected() {
        let first = StepMachine::new(vec![Instruction::Add(1); 4], vec![]);
        let second = StepMachine::new(vec![Instruction::Add(7); 4], vec![]);
        assert_eq!(first.hash(), second.hash());

        let mut engine = MachineReplayEngine::new();
        let cursor = engine.insert_checkpoint(first.clone()).unwrap();
        let err = engine.insert_checkpoint(second).unwrap_err();
        assert!(matches!(err, ReplayError::CheckpointConflict(hash) if hash == cursor.machine_hash));

        // Same machine again is fine, and the cursor still resolves to it
        assert_eq!(engine.insert_checkpoint(first).unwrap(), cursor);
        let mut session = engine.new_session(&cursor, true, &[1]).unwrap();
        assert_eq!(session.machine_at(1).unwrap().register(), 1);
    }

    #[test]
    fn test_sessions_are_independent() {
        let (engine, cursor) = engine();
        let mut ahead = engine.new_session(&cursor, true, &[0, 9]).unwrap();
        let mut behind = engine.new_session(&cursor, true, &[0, 4]).unwrap();

        assert_eq!(ahead.info_at(9).unwrap().gas_used, 9);
        assert_eq!(behind.info_at(0).unwrap().gas_used, 0);
        assert_eq!(behind.machine_at(4).unwrap().register(), 4);
        assert_eq!(ahead.machine_at(9).unwrap().register(), 9);
    }

    #[test]
    fn test_go_over_gas() {
        // Mul costs 3 gas: offsets inside it either overshoot or stop short
        let program = vec![Instruction::Add(1), Instruction::Mul(2), Instruction::Add(1)];

        let mut engine = MachineReplayEngine::new();
        let cursor = engine.insert_checkpoint(StepMachine::new(program, vec![])).unwrap();

        let mut over = engine.new_session(&cursor, true, &[2]).unwrap();
        assert_eq!(over.info_at(2).unwrap().gas_used, 4);

        let mut under = engine.new_session(&cursor, false, &[2]).unwrap();
        assert_eq!(under.info_at(2).unwrap().gas_used, 1);
    }
}
