//! Side-effect bundling: the only channel through which the state
//! machine core talks to the outside world.
//!
//! Every external effect the core wants (send a message, hash
//! something, persist something, commit something, hand back a
//! finished checkpoint) is appended to an `Actions` value rather than
//! performed in place, and every asynchronous result the host computed
//! (a digest, a finished checkpoint) is handed back through
//! `ActionResults`.

use crate::config::{EpochConfig, NetworkConfig};
use crate::digest::Digest;
use crate::identifiers::NodeId;
use crate::message::{Msg, QEntry};
use crate::ordering::SeqNo;

/// What a `HashRequest` is asking the host to hash, and what it should
/// stamp the resulting digest with to route it back.
///
/// Exactly one variant is ever populated per request, expressed as a
/// sum type so a caller can't construct a request with zero or
/// multiple origins.
#[derive(Clone, Debug)]
pub enum HashOrigin {
    /// Hash a proposed batch's request acknowledgments.
    Batch { seq_no: SeqNo, epoch: crate::ordering::Epoch },
    /// Hash a single client request's payload.
    Request { client_id: crate::identifiers::ClientId, req_no: u64 },
    /// Hash this replica's own epoch-change evidence before sending it.
    EpochChange { new_epoch: crate::ordering::Epoch },
    /// Re-derive a batch's digest from its constituent requests, to
    /// verify it against an expected value. `source` is the peer that
    /// forwarded the batch being verified, named so a mismatch can be
    /// attributed to it.
    VerifyBatch {
        source: NodeId,
        seq_no: SeqNo,
        epoch: crate::ordering::Epoch,
        expected_digest: Digest,
    },
    /// Re-derive a single request's digest, to verify it against an
    /// expected value. `source` is the peer that forwarded the request
    /// being verified.
    VerifyRequest {
        source: NodeId,
        client_id: crate::identifiers::ClientId,
        req_no: u64,
        expected_digest: Digest,
    },
}

/// A request, queued in `Actions::hash_requests`, for the host to
/// compute a digest over some piece of state named by `origin`.
#[derive(Clone, Debug)]
pub struct HashRequest {
    pub origin: HashOrigin,
}

/// The host's answer to a previously issued `HashRequest`, fed back in
/// through `ActionResults::digests`.
#[derive(Clone, Debug)]
pub struct HashResult {
    pub digest: Digest,
    pub request: HashRequest,
}

/// A ready-to-commit log entry, handed to the host's application state
/// machine in strict `SeqNo` order.
///
/// `network_config`/`epoch_config` are populated only on the rare
/// commit that also installs a reconfiguration.
#[derive(Clone, Debug)]
pub struct Commit {
    pub q_entry: QEntry,
    pub checkpoint: bool,
    pub network_config: Option<NetworkConfig>,
    pub epoch_config: Option<EpochConfig>,
}

/// The host's answer to the application-state checkpoint value implied
/// by a `Commit { checkpoint: true, .. }` — there is no separate
/// checkpoint-request action; the flagged `Commit` itself is the ask,
/// naming `seq_no` via its `q_entry`.
#[derive(Clone, Debug)]
pub struct CheckpointResult {
    pub seq_no: SeqNo,
    pub value: Vec<u8>,
}

/// One accumulated side effect. Rarely matched directly outside of a
/// host's dispatch loop; most callers just drain `Actions`'s typed
/// fields.
#[derive(Clone, Debug)]
pub enum Action {
    Broadcast(Msg),
    Unicast { target: NodeId, message: Msg },
    Hash(HashRequest),
    Persist(crate::message::PersistedEntry),
    Commit(Commit),
}

/// The side-effect bundle accumulated by a single `StateMachineCore`
/// step, drained by the host via `Ready`.
///
/// Kept as parallel typed vectors (broadcasts, unicasts, hash
/// requests, persists, commits) rather than one `Vec<Action>` — a host
/// usually wants to dispatch each kind to a different subsystem, so
/// forcing it to filter one mixed vector would just push the match back
/// out to every caller. A checkpoint value is asked for by a flagged
/// `Commit`, not a sixth field: see `Commit::checkpoint`.
#[derive(Clone, Debug, Default)]
pub struct Actions {
    pub broadcasts: Vec<Msg>,
    pub unicasts: Vec<(NodeId, Msg)>,
    pub hash_requests: Vec<HashRequest>,
    pub persists: Vec<crate::message::PersistedEntry>,
    pub commits: Vec<Commit>,
}

impl Actions {
    pub fn new() -> Self {
        Actions::default()
    }

    /// True if this bundle carries no side effects at all.
    pub fn is_empty(&self) -> bool {
        self.broadcasts.is_empty()
            && self.unicasts.is_empty()
            && self.hash_requests.is_empty()
            && self.persists.is_empty()
            && self.commits.is_empty()
    }

    /// Appends every side effect in `other` to `self`, in order.
    /// Appending an empty `Actions` is a no-op.
    pub fn append(&mut self, mut other: Actions) {
        self.broadcasts.append(&mut other.broadcasts);
        self.unicasts.append(&mut other.unicasts);
        self.hash_requests.append(&mut other.hash_requests);
        self.persists.append(&mut other.persists);
        self.commits.append(&mut other.commits);
    }

    /// Empties every field in place.
    pub fn clear(&mut self) {
        self.broadcasts.clear();
        self.unicasts.clear();
        self.hash_requests.clear();
        self.persists.clear();
        self.commits.clear();
    }
}

/// The asynchronous results a host feeds back in through
/// `StateMachineCore::add_results`: digests answering previously issued
/// `HashRequest`s, and checkpoint values answering a `Commit` that was
/// flagged `checkpoint: true`.
#[derive(Clone, Debug, Default)]
pub struct ActionResults {
    pub digests: Vec<HashResult>,
    pub checkpoints: Vec<CheckpointResult>,
}

impl ActionResults {
    pub fn new() -> Self {
        ActionResults::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_actions() -> Actions {
        let mut actions = Actions::new();
        actions.broadcasts.push(Msg::NewEpoch { epoch: crate::ordering::Epoch::from(1) });
        actions.hash_requests.push(HashRequest {
            origin: HashOrigin::Request {
                client_id: crate::identifiers::ClientId::from(1),
                req_no: 1,
            },
        });
        actions
    }

    #[test]
    fn appending_empty_actions_is_a_no_op() {
        let mut actions = sample_actions();
        let before = format!("{:?}", actions);
        actions.append(Actions::new());
        assert_eq!(format!("{:?}", actions), before);
    }

    #[test]
    fn clear_then_is_empty() {
        let mut actions = sample_actions();
        assert!(!actions.is_empty());
        actions.clear();
        assert!(actions.is_empty());
    }

    #[test]
    fn append_concatenates_in_order() {
        let mut a = Actions::new();
        a.hash_requests.push(HashRequest {
            origin: HashOrigin::Request {
                client_id: crate::identifiers::ClientId::from(1),
                req_no: 1,
            },
        });
        let mut b = Actions::new();
        b.hash_requests.push(HashRequest {
            origin: HashOrigin::Request {
                client_id: crate::identifiers::ClientId::from(2),
                req_no: 1,
            },
        });

        a.append(b);
        assert_eq!(a.hash_requests.len(), 2);
        match &a.hash_requests[1].origin {
            HashOrigin::Request { client_id, .. } => {
                assert_eq!(*client_id, crate::identifiers::ClientId::from(2));
            }
            _ => panic!("unexpected origin"),
        }
    }
}
