//! xlayer-dispute core types
//!
//! This crate contains everything needed to commit to an execution trace:
//! - Cuts and their on-chain hash
//! - Challenge segments and the bisection record
//! - The inbox delta accumulator table
//! - The replay engine interface, plus a reference engine

pub mod types;
pub mod error;
pub mod execution;
pub mod engine;
pub mod tracker;
pub mod executor;
pub mod inbox;
pub mod cut;
pub mod segment;

pub use types::*;
pub use error::{AccumulatorBoundsError, ReplayError, SegmentError};
pub use execution::{ExecutionCursor, ExecutionInfo};
pub use engine::{Assertion, ExecutionSession, Machine, MachineSnapshot, ReplayEngine};
pub use tracker::{ExecutionTracker, MachineReplayEngine};
pub use executor::{Instruction, StepMachine};
pub use inbox::InboxDeltaTable;
pub use cut::ExecutionCut;
pub use segment::{Bisection, ChallengeSegment};
