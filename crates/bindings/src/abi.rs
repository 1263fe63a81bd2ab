//! Minimal ABI encoder for the challenge contract calls

use tiny_keccak::{Hasher, Keccak};

/// ABI argument
#[derive(Clone, Debug)]
pub enum Token<'a> {
    /// `uint256`
    Uint(u64),
    /// `bytes32`
    Word([u8; 32]),
    /// `uint256[N]`, encoded in place
    FixedUints(Vec<u64>),
    /// `bytes32[N]`, encoded in place
    FixedWords(Vec<[u8; 32]>),
    /// `bytes32[]`
    Words(&'a [[u8; 32]]),
    /// `bytes`
    Bytes(&'a [u8]),
}

impl Token<'_> {
    fn is_dynamic(&self) -> bool {
        matches!(self, Self::Words(_) | Self::Bytes(_))
    }

    /// Size of the token in the head section
    fn head_len(&self) -> usize {
        match self {
            Self::FixedUints(values) => values.len() * 32,
            Self::FixedWords(words) => words.len() * 32,
            _ => 32,
        }
    }
}

/// First four bytes of keccak256 of the function signature
pub fn selector(signature: &str) -> [u8; 4] {
    let mut hasher = Keccak::v256();
    hasher.update(signature.as_bytes());
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    [output[0], output[1], output[2], output[3]]
}

fn uint_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..32].copy_from_slice(&value.to_be_bytes());
    word
}

/// Encode a function call: selector followed by head and tail sections
pub fn encode_call(signature: &str, tokens: &[Token<'_>]) -> Vec<u8> {
    let head_len: usize = tokens.iter().map(Token::head_len).sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&uint_word((head_len + tail.len()) as u64));
        }
        match token {
            Token::Uint(value) => head.extend_from_slice(&uint_word(*value)),
            Token::Word(word) => head.extend_from_slice(word),
            Token::FixedUints(values) => {
                for value in values {
                    head.extend_from_slice(&uint_word(*value));
                }
            }
            Token::FixedWords(words) => {
                for word in words {
                    head.extend_from_slice(word);
                }
            }
            Token::Words(words) => {
                tail.extend_from_slice(&uint_word(words.len() as u64));
                for word in words.iter() {
                    tail.extend_from_slice(word);
                }
            }
            Token::Bytes(bytes) => {
                tail.extend_from_slice(&uint_word(bytes.len() as u64));
                tail.extend_from_slice(bytes);
                let padding = (32 - bytes.len() % 32) % 32;
                tail.resize(tail.len() + padding, 0);
            }
        }
    }

    let mut data = Vec::with_capacity(4 + head.len() + tail.len());
    data.extend_from_slice(&selector(signature));
    data.extend_from_slice(&head);
    data.extend_from_slice(&tail);
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
    }

    #[test]
    fn test_static_call() {
        let data = encode_call("f(uint256,bytes32)", &[Token::Uint(1), Token::Word([0xff; 32])]);
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(data[4 + 31], 1);
        assert_eq!(&data[36..68], &[0xff; 32]);
    }

    #[test]
    fn test_bytes_padding() {
        let data = encode_call("g(bytes)", &[Token::Bytes(&[1, 2, 3])]);
        // offset, length, one padded word
        assert_eq!(data.len(), 4 + 3 * 32);
        assert_eq!(data[4 + 31], 32);
        assert_eq!(data[4 + 63], 3);
        assert_eq!(&data[68..71], &[1, 2, 3]);
        assert!(data[71..].iter().all(|b| *b == 0));
    }
}
