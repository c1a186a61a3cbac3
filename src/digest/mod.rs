//! Opaque digests.
//!
//! A `Digest` is the result of the external hasher over a canonical
//! serialization; this crate never computes one, it only stores,
//! compares, and threads them through hash-request/result
//! correlation, with no concrete hash implementation (blake3/sha2/...)
//! of its own, since hashing is an external collaborator.

use std::convert::TryFrom;
use std::fmt;

#[cfg(feature = "serialize_serde")]
use serde::{Deserialize, Serialize};

/// A digest produced by the host's hasher over a canonical
/// serialization of some piece of protocol state.
#[cfg_attr(feature = "serialize_serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Digest([u8; Digest::LENGTH]);

impl Digest {
    /// The length, in bytes, of a `Digest`.
    pub const LENGTH: usize = 32;

    /// Builds a `Digest` from a byte slice of exactly `Digest::LENGTH`
    /// bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        <[u8; Self::LENGTH]>::try_from(bytes).ok().map(Digest)
    }

    /// Returns the bytes of this `Digest`.
    pub fn as_bytes(&self) -> &[u8; Digest::LENGTH] {
        &self.0
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0[..]
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..4] {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, "..")
    }
}
