//! Identity newtypes shared across the crate.
//!
//! `NodeId` is a thin, transparent `u64` wrapper with `From`/`Into`
//! ergonomics. `ClientId` and `BucketId` follow the same pattern, all
//! three sharing the "unsigned 64-bit identity" / "logical partition
//! index" shape.

#[cfg(feature = "serialize_serde")]
use serde::{Deserialize, Serialize};

/// The id of a replica in the BFT cluster.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serialize_serde", derive(Serialize, Deserialize))]
#[repr(transparent)]
pub struct NodeId(u64);

impl From<u64> for NodeId {
    #[inline]
    fn from(id: u64) -> NodeId {
        NodeId(id)
    }
}

impl From<NodeId> for u64 {
    #[inline]
    fn from(id: NodeId) -> u64 {
        id.0
    }
}

/// The id of a client submitting requests to the cluster.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serialize_serde", derive(Serialize, Deserialize))]
#[repr(transparent)]
pub struct ClientId(u64);

impl From<u64> for ClientId {
    #[inline]
    fn from(id: u64) -> ClientId {
        ClientId(id)
    }
}

impl From<ClientId> for u64 {
    #[inline]
    fn from(id: ClientId) -> u64 {
        id.0
    }
}

/// A logical partition a client request number falls into, in
/// `[0, total_buckets)`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serialize_serde", derive(Serialize, Deserialize))]
#[repr(transparent)]
pub struct BucketId(u64);

impl BucketId {
    /// Returns the bucket a request number `req_no` belongs to, out of
    /// `total_buckets` buckets.
    ///
    /// TODO: this collides all low-numbered requests from different
    /// clients into the same bucket; salting by client id would spread
    /// them out.
    pub fn of(req_no: u64, total_buckets: u64) -> BucketId {
        BucketId(req_no % total_buckets)
    }
}

impl From<u64> for BucketId {
    #[inline]
    fn from(id: u64) -> BucketId {
        BucketId(id)
    }
}

impl From<BucketId> for u64 {
    #[inline]
    fn from(id: BucketId) -> u64 {
        id.0
    }
}
