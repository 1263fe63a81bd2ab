//! Replay engine interface
//!
//! The dispute logic only talks to the engine through [`ReplayEngine`] and the
//! session it opens. [`Machine`] is the lower-level interface used by the
//! reference engine in [`crate::tracker`].

use crate::error::ReplayError;
use crate::execution::{ExecutionCursor, ExecutionInfo};
use crate::types::{Hash, Offset};

/// Effects of running a machine for a bounded amount of gas
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Assertion {
    /// Gas consumed
    pub gas_used: u64,
    /// Inbox messages consumed
    pub inbox_messages_read: u64,
    /// Outgoing messages, in order
    pub sends: Vec<Vec<u8>>,
    /// Log entries, in order
    pub logs: Vec<Vec<u8>>,
}

/// Machine state captured at an offset, serializable for a one-step proof.
///
/// Both payloads are opaque to the dispute logic and are submitted unmodified.
pub trait MachineSnapshot {
    /// Primary state-transition proof for the next step
    fn marshal_for_proof(&self) -> Result<Vec<u8>, ReplayError>;

    /// Proof of the auxiliary buffer the next step may read or write
    fn marshal_buffer_proof(&self) -> Result<Vec<u8>, ReplayError>;
}

/// Deterministic machine driven by the reference engine
pub trait Machine: MachineSnapshot + Clone {
    /// Digest of the full machine state
    fn hash(&self) -> Hash;

    /// Run until `max_gas` is consumed or the machine halts.
    ///
    /// With `go_over_gas` the instruction that crosses the limit is executed,
    /// otherwise execution stops before it.
    fn execute(&mut self, max_gas: u64, go_over_gas: bool) -> Assertion;

    /// Whether the machine can make further progress
    fn is_halted(&self) -> bool;
}

/// One replay session, bound to a cursor and a list of offsets.
///
/// Offsets must be requested in non-decreasing order.
pub trait ExecutionSession {
    /// Machine state handed out for one-step proofs
    type Snapshot: MachineSnapshot;

    /// Execution info after replaying `offset` gas from the cursor
    fn info_at(&mut self, offset: Offset) -> Result<ExecutionInfo, ReplayError>;

    /// Machine state at `offset`, which must be one of the session's offsets
    fn machine_at(&mut self, offset: Offset) -> Result<Self::Snapshot, ReplayError>;
}

/// Execution replay engine
pub trait ReplayEngine {
    /// Session type opened by this engine
    type Session: ExecutionSession;

    /// Open a session replaying from `cursor` through the sorted `offsets`
    fn new_session(
        &self,
        cursor: &ExecutionCursor,
        go_over_gas: bool,
        offsets: &[Offset],
    ) -> Result<Self::Session, ReplayError>;
}
