//! Configuration recognized by the core state machine.
//!
//! These types are immutable for the lifetime of a `StateMachineCore`
//! instance: once built, a configuration is never mutated in place,
//! only swapped out wholesale (e.g. `NetworkConfig` arriving attached
//! to a `Commit`, or a new `EpochConfig` installed after an epoch
//! change the larger, unmodeled epoch-change machinery decided).

use crate::identifiers::{BucketId, NodeId};

/// Immutable, per-configuration cluster parameters.
#[derive(Clone, Debug)]
pub struct NetworkConfig {
    /// Total number of replicas in the cluster.
    n: usize,
    /// Maximum number of Byzantine replicas tolerated.
    f: usize,
    /// Sequence-number stride between checkpoints.
    checkpoint_interval: u64,
}

impl NetworkConfig {
    /// Builds a new `NetworkConfig`. Requires `n >= 3f + 1`.
    pub fn new(n: usize, f: usize, checkpoint_interval: u64) -> Self {
        assert!(n >= 3 * f + 1, "NetworkConfig violates n >= 3f+1");
        assert!(checkpoint_interval > 0, "checkpoint interval must be positive");
        NetworkConfig { n, f, checkpoint_interval }
    }

    /// Total number of replicas.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Maximum tolerated Byzantine replicas.
    pub fn f(&self) -> usize {
        self.f
    }

    /// The quorum size, `2f + 1`, required for prepare/commit/checkpoint
    /// and request-strength certificates.
    pub fn quorum(&self) -> usize {
        2 * self.f + 1
    }

    /// The sequence-number stride between checkpoints.
    pub fn checkpoint_interval(&self) -> u64 {
        self.checkpoint_interval
    }
}

/// Batch-assembly tunables read by the `Proposer`.
#[derive(Clone, Debug)]
pub struct BatchParameters {
    /// Threshold, in bytes, at which the proposer seals a pending batch.
    pub cut_size_bytes: usize,
}

/// This replica's local configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// This node's id.
    pub id: NodeId,
    /// Batch-assembly tunables.
    pub batch_parameters: BatchParameters,
}

/// The bucket leadership assignment and epoch number in effect.
///
/// Constructing a new `EpochConfig` (as the result of an epoch change)
/// is out of this crate's scope; the core only ever installs one
/// wholesale and reads leader assignments out of it.
#[derive(Clone, Debug)]
pub struct EpochConfig {
    epoch: crate::ordering::Epoch,
    /// Bucket -> leader assignment for this epoch.
    leaders: crate::collections::HashMap<BucketId, NodeId>,
}

impl EpochConfig {
    /// Builds a new `EpochConfig` from an explicit bucket/leader map.
    pub fn new(
        epoch: crate::ordering::Epoch,
        leaders: crate::collections::HashMap<BucketId, NodeId>,
    ) -> Self {
        EpochConfig { epoch, leaders }
    }

    /// The epoch this configuration applies to.
    pub fn epoch(&self) -> crate::ordering::Epoch {
        self.epoch
    }

    /// The total number of buckets in this epoch's assignment.
    pub fn total_buckets(&self) -> u64 {
        self.leaders.len() as u64
    }

    /// The node leading `bucket` in this epoch, if any.
    pub fn leader_of(&self, bucket: BucketId) -> Option<NodeId> {
        self.leaders.get(&bucket).copied()
    }

    /// Returns the buckets led by `node` in this epoch, in ascending
    /// `BucketId` order — iteration over the underlying map is
    /// unordered, but the order buckets are proposed in is externally
    /// visible (it shapes `SeqNo` assignment), so it must be sorted
    /// before any caller consumes it.
    pub fn buckets_led_by(&self, node: NodeId) -> Vec<BucketId> {
        let mut buckets: Vec<BucketId> = self
            .leaders
            .iter()
            .filter(|(_, leader)| **leader == node)
            .map(|(bucket, _)| *bucket)
            .collect();
        buckets.sort();
        buckets
    }
}
