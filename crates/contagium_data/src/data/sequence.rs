use serde::{Deserialize, Serialize};
use std::fmt;

/// An immutable pathogen sequence: a vector of small integer site states.
///
/// All sequences in one simulation instance share the same length, and every
/// state lies in `[0, K)` for the instance's alphabet size `K`. Identity is
/// content: two sequences with the same state vector compare equal and hash
/// identically, which is what the genotype pool dedups on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sequence {
    states: Vec<u8>,
}

impl Sequence {
    #[must_use]
    pub fn new(states: Vec<u8>) -> Self {
        Self { states }
    }

    /// Site states in order.
    #[must_use]
    pub fn states(&self) -> &[u8] {
        &self.states
    }

    /// Number of sites.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// State at `pos`. Panics if `pos` is out of range.
    #[must_use]
    pub fn state_at(&self, pos: usize) -> u8 {
        self.states[pos]
    }

    /// Largest state value present, or 0 for an empty sequence.
    #[must_use]
    pub fn max_state(&self) -> u8 {
        self.states.iter().copied().max().unwrap_or(0)
    }

    /// Compact hex rendering, one byte per site.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.states)
    }

    /// Inverse of [`Sequence::to_hex`].
    pub fn from_hex(hex_str: &str) -> anyhow::Result<Self> {
        let states = hex::decode(hex_str)?;
        Ok(Self { states })
    }
}

impl fmt::Display for Sequence {
    /// Canonical dash-free rendering used as the dedup key in logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Vec<u8>> for Sequence {
    fn from(states: Vec<u8>) -> Self {
        Self::new(states)
    }
}
