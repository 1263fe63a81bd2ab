//! Inbox delta accumulator table

use serde::{Deserialize, Serialize};
use crate::error::AccumulatorBoundsError;
use crate::types::{hash_pair, keccak256, Hash, ZERO_HASH};

/// Inbox delta digests indexed by the number of messages read.
///
/// Entry `k` commits to every message not yet consumed after `k` reads:
///
/// acc[n] = 0
/// acc[k] = H(acc[k + 1], H(message[k]))
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InboxDeltaTable {
    accs: Vec<Hash>,
}

impl InboxDeltaTable {
    /// Wrap a table that was built elsewhere
    pub fn from_digests(accs: Vec<Hash>) -> Self {
        Self { accs }
    }

    /// Build the table over the messages of one assertion
    pub fn from_messages<T: AsRef<[u8]>>(messages: &[T]) -> Self {
        let mut accs = vec![ZERO_HASH; messages.len() + 1];
        for (k, message) in messages.iter().enumerate().rev() {
            accs[k] = hash_pair(&accs[k + 1], &keccak256(&[message.as_ref()]));
        }
        Self { accs }
    }

    /// Digest after `count` messages have been read
    pub fn digest_at(&self, count: u64) -> Result<Hash, AccumulatorBoundsError> {
        usize::try_from(count)
            .ok()
            .and_then(|index| self.accs.get(index))
            .copied()
            .ok_or(AccumulatorBoundsError {
                count,
                len: self.accs.len(),
            })
    }

    /// Number of accumulator entries, one more than the message count
    pub fn len(&self) -> usize {
        self.accs.len()
    }

    /// Whether the table has no entries at all
    pub fn is_empty(&self) -> bool {
        self.accs.is_empty()
    }
}
