//! Common types and hashing helpers

use tiny_keccak::{Hasher, Keccak};

/// 32-byte hash type
pub type Hash = [u8; 32];

/// Position in a trace, in gas consumed since the execution cursor
pub type Offset = u64;

/// All-zero hash, the empty accumulator value
pub const ZERO_HASH: Hash = [0u8; 32];

/// Compute keccak256 over the concatenation of `parts`
pub fn keccak256(parts: &[&[u8]]) -> Hash {
    let mut hasher = Keccak::v256();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Hash two 32-byte values together
pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    keccak256(&[left, right])
}

/// Encode a counter as a Solidity `uint256` word (big-endian, left padded)
pub fn u256_word(value: u64) -> Hash {
    let mut word = [0u8; 32];
    word[24..32].copy_from_slice(&value.to_be_bytes());
    word
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_empty() {
        // keccak256("")
        let expected = hex::decode("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470").unwrap();
        assert_eq!(keccak256(&[]).to_vec(), expected);
    }

    #[test]
    fn test_parts_are_concatenated() {
        assert_eq!(keccak256(&[b"ab", b"c"]), keccak256(&[b"abc"]));
    }

    #[test]
    fn test_u256_word() {
        let word = u256_word(0x0102);
        assert_eq!(&word[..30], &[0u8; 30]);
        assert_eq!(&word[30..], &[0x01, 0x02]);
    }
}
