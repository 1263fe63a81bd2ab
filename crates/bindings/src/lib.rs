//! Contract bindings for the execution challenge
//!
//! The challenge contract interface is hand encoded: function selectors are
//! keccak256 of the signature and arguments follow the standard ABI head/tail
//! layout.

mod abi;

pub use abi::{encode_call, selector, Token};

use serde::{Deserialize, Serialize};

/// `bisectExecution(bytes32[],uint256,uint256,uint256,bytes32[])`
pub const BISECT_EXECUTION: &str = "bisectExecution(bytes32[],uint256,uint256,uint256,bytes32[])";

/// `oneStepProveExecution(bytes32[],uint256,uint256[4],bytes32[3],bytes32,bytes,bytes)`
pub const ONE_STEP_PROVE_EXECUTION: &str =
    "oneStepProveExecution(bytes32[],uint256,uint256[4],bytes32[3],bytes32,bytes,bytes)";

/// Counters of the execution info the one-step verifier starts from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionCounters {
    /// Gas used since the cursor
    pub gas_used: u64,
    /// Inbox messages consumed
    pub inbox_messages_read: u64,
    /// Messages sent
    pub send_count: u64,
    /// Logs emitted
    pub log_count: u64,
}

/// Calldata for `bisectExecution`.
///
/// `sub_cut_hashes` covers every boundary of the new bisection; the first is
/// implied by the contract (it equals the challenged segment's start cut)
/// and is not sent.
pub fn encode_bisect_execution(
    prev_cut_hashes: &[[u8; 32]],
    segment_to_challenge: u64,
    challenged_segment_start: u64,
    challenged_segment_length: u64,
    sub_cut_hashes: &[[u8; 32]],
) -> Vec<u8> {
    let new_hashes = sub_cut_hashes.get(1..).unwrap_or_default();
    encode_call(
        BISECT_EXECUTION,
        &[
            Token::Words(prev_cut_hashes),
            Token::Uint(segment_to_challenge),
            Token::Uint(challenged_segment_start),
            Token::Uint(challenged_segment_length),
            Token::Words(new_hashes),
        ],
    )
}

/// Calldata for `oneStepProveExecution`
#[allow(clippy::too_many_arguments)]
pub fn encode_one_step_prove_execution(
    prev_cut_hashes: &[[u8; 32]],
    segment_to_challenge: u64,
    counters: &ExecutionCounters,
    send_acc: [u8; 32],
    log_acc: [u8; 32],
    machine_hash: [u8; 32],
    inbox_delta: [u8; 32],
    machine_proof: &[u8],
    buffer_proof: &[u8],
) -> Vec<u8> {
    encode_call(
        ONE_STEP_PROVE_EXECUTION,
        &[
            Token::Words(prev_cut_hashes),
            Token::Uint(segment_to_challenge),
            Token::FixedUints(vec![
                counters.gas_used,
                counters.inbox_messages_read,
                counters.send_count,
                counters.log_count,
            ]),
            Token::FixedWords(vec![send_acc, log_acc, machine_hash]),
            Token::Word(inbox_delta),
            Token::Bytes(machine_proof),
            Token::Bytes(buffer_proof),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_at(data: &[u8], index: usize) -> &[u8] {
        &data[4 + index * 32..4 + (index + 1) * 32]
    }

    fn uint_at(data: &[u8], index: usize) -> u64 {
        let word = word_at(data, index);
        u64::from_be_bytes(word[24..].try_into().unwrap())
    }

    #[test]
    fn test_bisect_execution_layout() {
        let prev = [[1u8; 32], [2u8; 32]];
        let sub = [[1u8; 32], [3u8; 32], [4u8; 32]];
        let data = encode_bisect_execution(&prev, 0, 10, 20, &sub);

        assert_eq!(&data[..4], &selector(BISECT_EXECUTION));
        // Head: offset, uint, uint, uint, offset
        assert_eq!(uint_at(&data, 0), 5 * 32);
        assert_eq!(uint_at(&data, 2), 10);
        assert_eq!(uint_at(&data, 3), 20);
        // prev array is a length word plus two elements
        assert_eq!(uint_at(&data, 4), 8 * 32);
        assert_eq!(uint_at(&data, 5), 2);
        assert_eq!(word_at(&data, 7), &[2u8; 32]);
        // First sub hash is dropped
        assert_eq!(uint_at(&data, 8), 2);
        assert_eq!(word_at(&data, 9), &[3u8; 32]);
        assert_eq!(word_at(&data, 10), &[4u8; 32]);
        assert_eq!(data.len(), 4 + 11 * 32);
    }

    #[test]
    fn test_one_step_prove_layout() {
        let counters = ExecutionCounters {
            gas_used: 1,
            inbox_messages_read: 2,
            send_count: 3,
            log_count: 4,
        };
        let data = encode_one_step_prove_execution(
            &[],
            7,
            &counters,
            [5u8; 32],
            [6u8; 32],
            [7u8; 32],
            [8u8; 32],
            &[0xaa; 33],
            &[],
        );

        // Head: offset, uint, 4 uints, 3 words, word, offset, offset
        assert_eq!(uint_at(&data, 0), 12 * 32);
        assert_eq!(uint_at(&data, 1), 7);
        assert_eq!(uint_at(&data, 2), 1);
        assert_eq!(uint_at(&data, 5), 4);
        assert_eq!(word_at(&data, 8), &[7u8; 32]);
        assert_eq!(word_at(&data, 9), &[8u8; 32]);
        // Empty array takes one word, 33 proof bytes pad to two words
        assert_eq!(uint_at(&data, 10), 13 * 32);
        assert_eq!(uint_at(&data, 11), 16 * 32);
        assert_eq!(uint_at(&data, 12), 0);
        assert_eq!(uint_at(&data, 13), 33);
        assert_eq!(&word_at(&data, 15)[..2], &[0xaa, 0x00]);
        assert_eq!(uint_at(&data, 16), 0);
        assert_eq!(data.len(), 4 + 17 * 32);
    }
}
