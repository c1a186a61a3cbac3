//! Sequence and epoch numbering.
//!
//! `SeqNo` is a plain monotonic `u64` index: a slot in the total order
//! never wraps around.

#[cfg(feature = "serialize_serde")]
use serde::{Deserialize, Serialize};

/// Something which can report its own position in the total order.
pub trait Orderable {
    /// Returns the sequence number of this entity.
    fn sequence_number(&self) -> SeqNo;
}

/// Unsigned 64-bit monotonic index of a slot in the total order.
#[cfg_attr(feature = "serialize_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Default)]
#[repr(transparent)]
pub struct SeqNo(u64);

impl SeqNo {
    /// The sequence number of the synthetic genesis checkpoint.
    pub const ZERO: SeqNo = SeqNo(0);

    /// Returns the following sequence number.
    #[inline]
    pub fn next(self) -> SeqNo {
        SeqNo(self.0 + 1)
    }

    /// Returns this sequence number's underlying representation.
    #[inline]
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl From<u64> for SeqNo {
    #[inline]
    fn from(value: u64) -> SeqNo {
        SeqNo(value)
    }
}

impl From<SeqNo> for u64 {
    #[inline]
    fn from(seq: SeqNo) -> u64 {
        seq.0
    }
}

impl std::ops::Add<u64> for SeqNo {
    type Output = SeqNo;

    #[inline]
    fn add(self, rhs: u64) -> SeqNo {
        SeqNo(self.0 + rhs)
    }
}

impl std::fmt::Display for SeqNo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unsigned 64-bit view/epoch identifier.
#[cfg_attr(feature = "serialize_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Default)]
#[repr(transparent)]
pub struct Epoch(u64);

impl Epoch {
    /// Returns the following epoch.
    #[inline]
    pub fn next(self) -> Epoch {
        Epoch(self.0 + 1)
    }

    /// Returns this epoch's underlying representation.
    #[inline]
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl From<u64> for Epoch {
    #[inline]
    fn from(value: u64) -> Epoch {
        Epoch(value)
    }
}

impl From<Epoch> for u64 {
    #[inline]
    fn from(epoch: Epoch) -> u64 {
        epoch.0
    }
}

impl std::fmt::Display for Epoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seqno_next_is_monotonic() {
        let s = SeqNo::from(41);
        assert_eq!(s.next(), SeqNo::from(42));
    }

    #[test]
    fn seqno_ordering_is_numeric() {
        assert!(SeqNo::from(1) < SeqNo::from(2));
        assert!(SeqNo::from(100) > SeqNo::from(3));
    }
}
