//! Execution cuts

use serde::{Deserialize, Serialize};
use crate::execution::ExecutionInfo;
use crate::types::{keccak256, u256_word, Hash};

/// Commitment to the state of an execution at one checkpoint.
///
/// Cuts are compared only through [`ExecutionCut::cut_hash`], the value the
/// dispute contract stores. There is intentionally no `PartialEq`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionCut {
    /// Gas used since the assertion start
    pub gas_used: u64,
    /// Inbox delta for the messages not yet read
    pub inbox_delta: Hash,
    /// Machine hash at this point
    pub machine_state: Hash,
    /// Running hash over sent messages
    pub send_acc: Hash,
    /// Messages sent
    pub send_count: u64,
    /// Running hash over emitted logs
    pub log_acc: Hash,
    /// Logs emitted
    pub log_count: u64,
}

impl ExecutionCut {
    /// Build a cut from replay output and the inbox delta at its read count
    pub fn from_info(info: &ExecutionInfo, inbox_delta: Hash) -> Self {
        Self {
            gas_used: info.gas_used,
            inbox_delta,
            machine_state: info.machine_hash,
            send_acc: info.send_acc,
            send_count: info.send_count,
            log_acc: info.log_acc,
            log_count: info.log_count,
        }
    }

    /// Hash of everything except gas, packed as the contract does
    pub fn rest_hash(&self) -> Hash {
        keccak256(&[
            &self.inbox_delta,
            &self.machine_state,
            &self.send_acc,
            &u256_word(self.send_count),
            &self.log_acc,
            &u256_word(self.log_count),
        ])
    }

    /// keccak256(uint256 gasUsed ‖ bytes32 rest)
    pub fn cut_hash(&self) -> Hash {
        keccak256(&[&u256_word(self.gas_used), &self.rest_hash()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ZERO_HASH;

    fn cut() -> ExecutionCut {
        ExecutionCut {
            gas_used: 100,
            inbox_delta: [1u8; 32],
            machine_state: [2u8; 32],
            send_acc: [3u8; 32],
            send_count: 4,
            log_acc: [5u8; 32],
            log_count: 6,
        }
    }

    #[test]
    fn test_cut_hash_packing() {
        let cut = cut();
        let mut rest = Vec::new();
        rest.extend_from_slice(&[1u8; 32]);
        rest.extend_from_slice(&[2u8; 32]);
        rest.extend_from_slice(&[3u8; 32]);
        rest.extend_from_slice(&u256_word(4));
        rest.extend_from_slice(&[5u8; 32]);
        rest.extend_from_slice(&u256_word(6));
        assert_eq!(rest.len(), 192);
        assert_eq!(cut.rest_hash(), keccak256(&[&rest]));

        let expected = keccak256(&[&u256_word(100), &keccak256(&[&rest])]);
        assert_eq!(cut.cut_hash(), expected);
    }

    #[test]
    fn test_every_field_is_committed() {
        let base = cut().cut_hash();

        let mut changed = cut();
        changed.log_count += 1;
        assert_ne!(changed.cut_hash(), base);

        let mut changed = cut();
        changed.inbox_delta = ZERO_HASH;
        assert_ne!(changed.cut_hash(), base);

        let mut changed = cut();
        changed.gas_used -= 1;
        assert_ne!(changed.cut_hash(), base);
    }
}
