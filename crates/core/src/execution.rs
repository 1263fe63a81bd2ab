//! Execution cursor and per-offset execution info

use serde::{Deserialize, Serialize};
use crate::engine::Assertion;
use crate::types::{hash_pair, keccak256, Hash, ZERO_HASH};

/// Checkpoint in a claimed execution from which replay can resume.
///
/// This is a plain value: the machine itself stays with the replay engine,
/// which resolves it by `machine_hash`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionCursor {
    /// Hash of the machine the cursor points at
    pub machine_hash: Hash,
    /// Gas used before this cursor
    pub total_gas: u64,
    /// Inbox messages read before this cursor
    pub total_messages_read: u64,
    /// Messages sent before this cursor
    pub total_send_count: u64,
    /// Logs emitted before this cursor
    pub total_log_count: u64,
}

impl ExecutionCursor {
    /// Cursor at the start of a machine's execution
    pub fn new(machine_hash: Hash) -> Self {
        Self {
            machine_hash,
            total_gas: 0,
            total_messages_read: 0,
            total_send_count: 0,
            total_log_count: 0,
        }
    }

    /// Cursor reached after running `info` from this one
    pub fn advance(&self, info: &ExecutionInfo) -> Self {
        Self {
            machine_hash: info.machine_hash,
            total_gas: self.total_gas + info.gas_used,
            total_messages_read: self.total_messages_read + info.inbox_messages_read,
            total_send_count: self.total_send_count + info.send_count,
            total_log_count: self.total_log_count + info.log_count,
        }
    }
}

/// Replay output at one offset, relative to the cursor the session started from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionInfo {
    /// Gas used since the cursor
    pub gas_used: u64,
    /// Inbox messages read since the cursor
    pub inbox_messages_read: u64,
    /// Messages sent since the cursor
    pub send_count: u64,
    /// Logs emitted since the cursor
    pub log_count: u64,
    /// Running hash over sent messages, zero at the cursor
    pub send_acc: Hash,
    /// Running hash over emitted logs, zero at the cursor
    pub log_acc: Hash,
    /// Machine hash after execution
    pub machine_hash: Hash,
}

impl ExecutionInfo {
    /// Info at the cursor itself: nothing executed yet
    pub fn start(machine_hash: Hash) -> Self {
        Self {
            gas_used: 0,
            inbox_messages_read: 0,
            send_count: 0,
            log_count: 0,
            send_acc: ZERO_HASH,
            log_acc: ZERO_HASH,
            machine_hash,
        }
    }

    /// Fold an assertion produced by the machine into the running totals
    pub fn apply(&mut self, assertion: &Assertion, machine_hash: Hash) {
        self.gas_used += assertion.gas_used;
        self.inbox_messages_read += assertion.inbox_messages_read;
        for send in &assertion.sends {
            self.send_acc = hash_pair(&self.send_acc, &keccak256(&[send]));
        }
        self.send_count += assertion.sends.len() as u64;
        for log in &assertion.logs {
            self.log_acc = hash_pair(&self.log_acc, &keccak256(&[log]));
        }
        self.log_count += assertion.logs.len() as u64;
        self.machine_hash = machine_hash;
    }
}
