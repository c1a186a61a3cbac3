//! Checkpoint stability tracking.
//!
//! This crate depends on a checkpoint tracker only to answer "is this
//! (SeqNo, Value) stable?" — i.e. has it been vouched for, via
//! `Checkpoint` wire messages, by a quorum of `2f + 1` replicas.
//! View-change-grade bookkeeping (pruning superseded candidate values,
//! watermark advancement beyond what the core needs) is left to the
//! larger, unmodeled epoch/checkpoint orchestration layer.

use crate::collections::{self, HashMap};
use crate::identifiers::NodeId;
use crate::ordering::SeqNo;

struct Candidate {
    value: Vec<u8>,
    voters: collections::HashSet<NodeId>,
}

/// Tracks, per `SeqNo`, which values have been vouched for by which
/// replicas, and whether any of them has reached quorum.
#[derive(Default)]
pub struct CheckpointTracker {
    quorum: usize,
    candidates: HashMap<SeqNo, Vec<Candidate>>,
}

impl CheckpointTracker {
    /// Builds a tracker requiring `quorum` matching vouches to declare
    /// a checkpoint stable.
    pub fn new(quorum: usize) -> Self {
        CheckpointTracker {
            quorum,
            candidates: collections::hash_map(),
        }
    }

    /// Records that `voter` vouches for `value` at `seq_no`. Duplicate
    /// vouches from the same voter for the same value are a no-op.
    pub fn vouch(&mut self, seq_no: SeqNo, value: &[u8], voter: NodeId) {
        let candidates = self
            .candidates
            .entry(seq_no)
            .or_insert_with(Vec::new);

        if let Some(candidate) = candidates.iter_mut().find(|c| c.value == value) {
            candidate.voters.insert(voter);
            return;
        }

        let mut voters = collections::hash_set();
        voters.insert(voter);
        candidates.push(Candidate { value: value.to_vec(), voters });
    }

    /// Returns the info this tracker has on the checkpoint candidate(s)
    /// at `seq_no`.
    pub fn checkpoint(&self, seq_no: SeqNo) -> CheckpointInfo {
        let stable_value = self
            .candidates
            .get(&seq_no)
            .and_then(|candidates| {
                candidates
                    .iter()
                    .find(|c| c.voters.len() >= self.quorum)
                    .map(|c| c.value.clone())
            });

        CheckpointInfo { stable: stable_value.is_some() }
    }

    /// True if some value at `seq_no` has reached quorum.
    pub fn is_stable(&self, seq_no: SeqNo) -> bool {
        self.checkpoint(seq_no).stable
    }

    /// Drops all candidate bookkeeping below `low_watermark`, mirroring
    /// `PersistedLog::truncate`.
    pub fn truncate(&mut self, low_watermark: SeqNo) {
        self.candidates.retain(|seq_no, _| *seq_no >= low_watermark);
    }
}

/// What the tracker knows about the checkpoint candidate(s) at a given
/// `SeqNo`.
pub struct CheckpointInfo {
    pub stable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn becomes_stable_at_quorum() {
        let mut tracker = CheckpointTracker::new(3);
        let seq = SeqNo::from(10);
        tracker.vouch(seq, b"state-a", NodeId::from(0));
        tracker.vouch(seq, b"state-a", NodeId::from(1));
        assert!(!tracker.is_stable(seq));
        tracker.vouch(seq, b"state-a", NodeId::from(2));
        assert!(tracker.is_stable(seq));
    }

    #[test]
    fn duplicate_vouch_does_not_inflate_count() {
        let mut tracker = CheckpointTracker::new(2);
        let seq = SeqNo::from(5);
        tracker.vouch(seq, b"x", NodeId::from(0));
        tracker.vouch(seq, b"x", NodeId::from(0));
        assert!(!tracker.is_stable(seq));
    }

    #[test]
    fn differing_values_do_not_share_a_tally() {
        let mut tracker = CheckpointTracker::new(2);
        let seq = SeqNo::from(5);
        tracker.vouch(seq, b"x", NodeId::from(0));
        tracker.vouch(seq, b"y", NodeId::from(1));
        assert!(!tracker.is_stable(seq));
    }
}
