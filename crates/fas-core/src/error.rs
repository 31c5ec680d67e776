//! Error types for slot construction and edge parsing.

use std::error::Error;
use std::fmt;

/// Errors building a [`FasSlot`](crate::FasSlot).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotError {
    /// The candidate has more edges than a ring slot can carry.
    ///
    /// Producers discard such candidates locally; they never reach the ring.
    TooLarge {
        /// Number of edges in the rejected candidate.
        len: usize,
        /// Slot capacity (`MAX_FAS_LEN`).
        max: usize,
    },
    /// A raw slot read back from shared memory carries a size outside
    /// `[0, MAX_FAS_LEN]`.
    SizeOutOfRange {
        /// The size field as stored.
        size: u32,
    },
}

impl fmt::Display for SlotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge { len, max } => {
                write!(f, "feedback arc set of {len} edges exceeds slot capacity {max}")
            }
            Self::SizeOutOfRange { size } => {
                write!(f, "slot size {size} is outside the valid range")
            }
        }
    }
}

impl Error for SlotError {}

/// An edge token that is not of the form `<start>-<end>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeParseError {
    /// The token as given.
    pub input: String,
    /// What was wrong with it.
    pub reason: String,
}

impl fmt::Display for EdgeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid edge '{}': {}", self.input, self.reason)
    }
}

impl Error for EdgeParseError {}
