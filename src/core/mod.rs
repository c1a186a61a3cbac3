//! `StateMachineCore`: the glue binding `PersistedLog`, `Proposer`, and
//! `Actions` into the pure, deterministic state machine a host drives.
//!
//! Vote tallying is scoped down to exactly what this crate's commit
//! path needs: a `ConsensusSlot` per `(SeqNo, Epoch)`, counting
//! distinct voters rather than raw votes, so a duplicate message from
//! the same peer is structurally a no-op rather than inflating a
//! tally.

use crate::actions::{ActionResults, Actions, Commit, HashOrigin, HashRequest};
use crate::checkpoint::CheckpointTracker;
use crate::client::ClientWindows;
use crate::collections::{self, HashMap, HashSet};
use crate::config::{Config, EpochConfig, NetworkConfig};
use crate::digest::Digest;
use crate::identifiers::{ClientId, NodeId};
use crate::log::PersistedLog;
use crate::message::{Msg, PEntry, PersistedEntry, QEntry, RequestAck};
use crate::ordering::{Epoch, SeqNo};
use crate::proposer::Proposer;
use smallvec::SmallVec;

/// A slot's request acks and its prepare/commit voters. Both stay small
/// and bounded (one batch's worth of acks; at most the cluster size of
/// voters), so they're kept inline rather than heap-allocated like the
/// teacher's own `communication` layer does for its per-message state.
type AckSet = SmallVec<[RequestAck; 8]>;
type VoteSet = SmallVec<[NodeId; 8]>;

/// Records `voter` in `votes` if it isn't already present. Linear scan
/// is fine at cluster scale; this is what a `HashSet` would have cost
/// anyway once you account for hashing, and it avoids a second
/// allocation for what's usually a handful of voters.
fn record_vote(votes: &mut VoteSet, voter: NodeId) {
    if !votes.contains(&voter) {
        votes.push(voter);
    }
}

/// Per-`(SeqNo, Epoch)` voting state, the minimal slot needed to drive
/// a batch from proposal to commit.
#[derive(Default)]
struct ConsensusSlot {
    request_acks: Option<AckSet>,
    digest: Option<Digest>,
    prepare_votes: VoteSet,
    commit_votes: VoteSet,
    prepared: bool,
    committed: bool,
    /// A forwarded batch's request acks, staged while its digest is
    /// re-derived and checked against this slot's already-known digest.
    pending_verify: Option<AckSet>,
}

impl ConsensusSlot {
    fn new() -> Self {
        ConsensusSlot {
            request_acks: None,
            digest: None,
            prepare_votes: SmallVec::new(),
            commit_votes: SmallVec::new(),
            prepared: false,
            committed: false,
            pending_verify: None,
        }
    }
}

/// The pure, deterministic core state machine: the glue a host drives
/// through `propose`/`step`/`tick`/`add_results`/`ready`.
///
/// Holds no transport, no durable storage, and no hasher of its own —
/// every side effect crosses the boundary as an `Action`.
pub struct StateMachineCore {
    config: Config,
    network_config: NetworkConfig,
    epoch_config: EpochConfig,
    log: PersistedLog,
    proposer: Proposer,
    client_windows: ClientWindows,
    checkpoint_tracker: CheckpointTracker,
    slots: HashMap<(SeqNo, Epoch), ConsensusSlot>,
    /// SeqNos whose commit is held back while a checkpoint result is
    /// outstanding, in the order they became ready.
    held_commits: Vec<SeqNo>,
    /// The SeqNo of the checkpoint action currently outstanding, if
    /// any.
    checkpoint_pending: Option<SeqNo>,
    /// The next SeqNo to hand out to a sealed batch. Tracked
    /// separately from `log.last_committed()`, which only advances on
    /// commit: a single `tick()` can seal and propose several batches
    /// before any of them commit, and each still needs a distinct
    /// SeqNo.
    next_seq_no: SeqNo,
    actions: Actions,
    /// Peers whose forwarded content failed digest verification.
    /// Byzantine behavior, not fatal: the offending message is dropped
    /// and the source recorded here for the host's telemetry.
    suspects: HashSet<NodeId>,
    /// A forwarded request's payload, staged while its digest is
    /// re-derived and checked against the digest we already expect for
    /// it (from prior `RequestAck` traffic).
    pending_verify_requests: HashMap<(ClientId, u64), Vec<u8>>,
}

impl StateMachineCore {
    /// Builds a new core for `config`, under `network_config` and the
    /// initial `epoch_config`.
    pub fn new(config: Config, network_config: NetworkConfig, epoch_config: EpochConfig) -> Self {
        let led_buckets = epoch_config.buckets_led_by(config.id);
        let quorum = network_config.quorum();
        let proposer = Proposer::new(
            config.batch_parameters.cut_size_bytes,
            epoch_config.total_buckets(),
            quorum,
            &led_buckets,
        );

        let checkpoint_interval = network_config.checkpoint_interval();
        let log = PersistedLog::new(checkpoint_interval);
        let next_seq_no = log.last_committed().next();

        StateMachineCore {
            config,
            network_config,
            epoch_config,
            log,
            proposer,
            client_windows: ClientWindows::new(),
            checkpoint_tracker: CheckpointTracker::new(quorum),
            slots: collections::hash_map(),
            held_commits: Vec::new(),
            checkpoint_pending: None,
            next_seq_no,
            actions: Actions::new(),
            suspects: collections::hash_set(),
            pending_verify_requests: collections::hash_map(),
        }
    }

    /// Loads the persisted log from `storage`, replacing whatever state
    /// this core had accumulated. Call once, before driving any other
    /// operation.
    pub fn load<S: crate::log::Storage>(&mut self, storage: &mut S) -> crate::error::Result<()> {
        self.log.load(storage)?;
        self.next_seq_no = self.log.last_committed().next();
        Ok(())
    }

    /// Admits a new client request, requesting its digest be computed.
    pub fn propose(&mut self, client_id: ClientId, req_no: u64, data: Vec<u8>) {
        self.client_windows.window_mut(client_id).admit(req_no, data);
        self.actions.hash_requests.push(HashRequest {
            origin: HashOrigin::Request { client_id, req_no },
        });
    }

    /// Steps the state machine with a message received from `source`.
    pub fn step(&mut self, source: NodeId, message: Msg) {
        match message {
            Msg::RequestAck(ack) => {
                let window = self.client_windows.window_mut(ack.client_id);
                window.set_digest(ack.req_no, ack.digest);
                window.ack(ack.req_no, source);
            }
            Msg::PrePrepare { seq_no, epoch, request_acks } => {
                let slot = self.slot_mut(seq_no, epoch);
                slot.request_acks = Some(SmallVec::from_vec(request_acks.clone()));
                self.actions.hash_requests.push(HashRequest {
                    origin: HashOrigin::Batch { seq_no, epoch },
                });
                self.actions.broadcasts.push(Msg::PrePrepare { seq_no, epoch, request_acks });
            }
            Msg::Prepare { seq_no, epoch, digest } => {
                self.on_prepare_vote(seq_no, epoch, digest, source);
            }
            Msg::Commit { seq_no, epoch, digest } => {
                self.on_commit_vote(seq_no, epoch, digest, source);
            }
            Msg::Checkpoint { seq_no, value } => {
                self.checkpoint_tracker.vouch(seq_no, &value, source);
                self.maybe_release_checkpoint(seq_no);
            }
            Msg::EpochChange { .. } | Msg::NewEpoch { .. } => {
                // epoch-change orchestration is out of scope; a host
                // driving a real cluster installs a new EpochConfig out
                // of band instead of routing it through `step`.
            }
            Msg::ForwardRequest(request) => {
                let expected = self
                    .client_windows
                    .window(request.client_id)
                    .and_then(|w| w.request(request.req_no))
                    .and_then(|r| r.digest());
                match expected {
                    Some(expected_digest) => {
                        self.pending_verify_requests
                            .insert((request.client_id, request.req_no), request.data);
                        self.actions.hash_requests.push(HashRequest {
                            origin: HashOrigin::VerifyRequest {
                                source,
                                client_id: request.client_id,
                                req_no: request.req_no,
                                expected_digest,
                            },
                        });
                    }
                    // no digest to check this forwarded payload against
                    // yet; admit it directly, same as a fresh Propose.
                    None => {
                        self.client_windows
                            .window_mut(request.client_id)
                            .admit(request.req_no, request.data);
                    }
                }
            }
            Msg::ForwardBatch { source: origin, seq_no, epoch, request_acks } => {
                let expected = self.slots.get(&(seq_no, epoch)).and_then(|s| s.digest);
                match expected {
                    Some(expected_digest) => {
                        self.slot_mut(seq_no, epoch).pending_verify =
                            Some(SmallVec::from_vec(request_acks));
                        self.actions.hash_requests.push(HashRequest {
                            origin: HashOrigin::VerifyBatch {
                                source: origin,
                                seq_no,
                                epoch,
                                expected_digest,
                            },
                        });
                    }
                    // we have no digest of our own yet to verify this
                    // batch against; admit it directly.
                    None => {
                        self.slot_mut(seq_no, epoch).request_acks =
                            Some(SmallVec::from_vec(request_acks));
                    }
                }
            }
        }
    }

    /// Advances batch proposal: drains strong client requests into the
    /// buckets this replica leads, sealing and broadcasting any batch
    /// that becomes ready.
    pub fn tick(&mut self) {
        self.proposer.step_all_client_windows(&mut self.client_windows);

        let led_buckets = self.epoch_config.buckets_led_by(self.config.id);
        for bucket in led_buckets {
            while self.proposer.has_pending(bucket) {
                let request_acks = self.proposer.next(bucket);
                let seq_no = self.next_seq_no;
                self.next_seq_no = self.next_seq_no.next();
                let epoch = self.epoch_config.epoch();

                let slot = self.slot_mut(seq_no, epoch);
                slot.request_acks = Some(SmallVec::from_vec(request_acks.clone()));

                self.actions.hash_requests.push(HashRequest {
                    origin: HashOrigin::Batch { seq_no, epoch },
                });
                self.actions
                    .broadcasts
                    .push(Msg::PrePrepare { seq_no, epoch, request_acks });
            }
        }
    }

    /// Feeds back asynchronous results (digests, checkpoint values)
    /// the host computed for previously issued actions.
    pub fn add_results(&mut self, results: ActionResults) {
        for hash_result in results.digests {
            self.on_hash_result(hash_result);
        }
        for checkpoint_result in results.checkpoints {
            self.log.add(PersistedEntry::Checkpoint(crate::message::Checkpoint {
                seq_no: checkpoint_result.seq_no,
                value: checkpoint_result.value.clone(),
            }));
            self.actions.broadcasts.push(Msg::Checkpoint {
                seq_no: checkpoint_result.seq_no,
                value: checkpoint_result.value.clone(),
            });
            self.checkpoint_tracker.vouch(
                checkpoint_result.seq_no,
                &checkpoint_result.value,
                self.config.id,
            );
            if self.checkpoint_pending == Some(checkpoint_result.seq_no) {
                self.checkpoint_pending = None;
            }
            self.release_held_commits();
            self.maybe_release_checkpoint(checkpoint_result.seq_no);
        }
    }

    /// Drains and returns every side effect accumulated since the last
    /// call.
    pub fn ready(&mut self) -> Actions {
        std::mem::take(&mut self.actions)
    }

    fn slot_mut(&mut self, seq_no: SeqNo, epoch: Epoch) -> &mut ConsensusSlot {
        self.slots.entry((seq_no, epoch)).or_insert_with(ConsensusSlot::new)
    }

    fn on_hash_result(&mut self, hash_result: crate::actions::HashResult) {
        match hash_result.request.origin {
            HashOrigin::Request { client_id, req_no } => {
                self.client_windows.window_mut(client_id).set_digest(req_no, hash_result.digest);
                self.client_windows.window_mut(client_id).ack(req_no, self.config.id);
                self.actions.broadcasts.push(Msg::RequestAck(crate::message::RequestAck {
                    client_id,
                    req_no,
                    digest: hash_result.digest,
                }));
            }
            HashOrigin::Batch { seq_no, epoch } => {
                let self_id = self.config.id;
                let slot = self.slot_mut(seq_no, epoch);
                slot.digest = Some(hash_result.digest);
                record_vote(&mut slot.prepare_votes, self_id);
                self.actions
                    .broadcasts
                    .push(Msg::Prepare { seq_no, epoch, digest: hash_result.digest });
                self.check_prepare_quorum(seq_no, epoch);
            }
            HashOrigin::VerifyBatch { source, seq_no, epoch, expected_digest } => {
                let matches = hash_result.digest == expected_digest;
                let slot = self.slot_mut(seq_no, epoch);
                let staged = slot.pending_verify.take();
                if matches {
                    if let Some(request_acks) = staged {
                        slot.request_acks = Some(request_acks);
                    }
                } else {
                    self.suspects.insert(source);
                }
            }
            HashOrigin::VerifyRequest { source, client_id, req_no, expected_digest } => {
                let matches = hash_result.digest == expected_digest;
                let staged = self.pending_verify_requests.remove(&(client_id, req_no));
                if matches {
                    if let Some(data) = staged {
                        self.client_windows.window_mut(client_id).admit(req_no, data);
                    }
                } else {
                    self.suspects.insert(source);
                }
            }
            HashOrigin::EpochChange { .. } => {
                // the resulting digest is attached to this replica's own
                // epoch-change broadcast by the (unmodeled) epoch-change
                // orchestration layer, not by this crate.
            }
        }
    }

    /// Peers whose forwarded content has failed digest verification so
    /// far. Byzantine behavior, not fatal — the host's telemetry layer
    /// decides what, if anything, to do about a suspect replica.
    pub fn suspects(&self) -> &HashSet<NodeId> {
        &self.suspects
    }

    fn on_prepare_vote(&mut self, seq_no: SeqNo, epoch: Epoch, digest: Digest, voter: NodeId) {
        let slot = self.slot_mut(seq_no, epoch);
        if slot.digest.is_none() {
            slot.digest = Some(digest);
        }
        record_vote(&mut slot.prepare_votes, voter);
        self.check_prepare_quorum(seq_no, epoch);
    }

    fn check_prepare_quorum(&mut self, seq_no: SeqNo, epoch: Epoch) {
        let quorum = self.network_config.quorum();
        let slot = self.slots.get(&(seq_no, epoch)).unwrap();
        if slot.prepared || slot.prepare_votes.len() < quorum {
            return;
        }
        let digest = match slot.digest {
            Some(d) => d,
            None => return,
        };

        self.log.add_p_entry(PEntry { seq_no, epoch, digest });
        self.actions
            .persists
            .push(PersistedEntry::PEntry(PEntry { seq_no, epoch, digest }));

        let self_id = self.config.id;
        let slot = self.slot_mut(seq_no, epoch);
        slot.prepared = true;
        record_vote(&mut slot.commit_votes, self_id);
        self.actions.broadcasts.push(Msg::Commit { seq_no, epoch, digest });

        self.check_commit_quorum(seq_no, epoch);
    }

    fn on_commit_vote(&mut self, seq_no: SeqNo, epoch: Epoch, digest: Digest, voter: NodeId) {
        let slot = self.slot_mut(seq_no, epoch);
        if slot.digest.is_none() {
            slot.digest = Some(digest);
        }
        record_vote(&mut slot.commit_votes, voter);
        self.check_commit_quorum(seq_no, epoch);
    }

    fn check_commit_quorum(&mut self, seq_no: SeqNo, epoch: Epoch) {
        let quorum = self.network_config.quorum();
        let slot = self.slots.get(&(seq_no, epoch)).unwrap();
        if slot.committed || slot.commit_votes.len() < quorum {
            return;
        }
        let digest = match slot.digest {
            Some(d) => d,
            None => return,
        };
        let request_acks = match &slot.request_acks {
            Some(acks) => acks.clone().into_vec(),
            None => return,
        };

        self.slot_mut(seq_no, epoch).committed = true;

        let q_entry = QEntry { seq_no, epoch, digest, request_acks };
        self.log.add_q_entry(q_entry.clone());
        self.actions.persists.push(PersistedEntry::QEntry(q_entry.clone()));

        for ack in &q_entry.request_acks {
            self.client_windows.window_mut(ack.client_id).mark_committed(ack.req_no);
        }

        self.log.set_last_committed(seq_no);

        let checkpoint_interval = self.network_config.checkpoint_interval();
        let is_checkpoint = seq_no.into_inner() % checkpoint_interval == 0;

        if self.checkpoint_pending.is_some() {
            self.held_commits.push(seq_no);
        } else {
            self.emit_commit(q_entry, is_checkpoint);
            if is_checkpoint {
                self.checkpoint_pending = Some(seq_no);
            }
        }
    }

    fn emit_commit(&mut self, q_entry: QEntry, is_checkpoint: bool) {
        self.actions.commits.push(Commit {
            q_entry,
            checkpoint: is_checkpoint,
            network_config: None,
            epoch_config: None,
        });
    }

    fn release_held_commits(&mut self) {
        let mut held = std::mem::take(&mut self.held_commits);
        held.sort();

        let checkpoint_interval = self.network_config.checkpoint_interval();
        for seq_no in held {
            if self.checkpoint_pending.is_some() {
                // a release further down the queue turned out to be a
                // checkpoint boundary itself; anything still held after
                // it waits for that one in turn.
                self.held_commits.push(seq_no);
                continue;
            }

            let epoch = self.epoch_config.epoch();
            let q_entry = match self.log.q_entry(seq_no, epoch) {
                Some(q) => q.clone(),
                None => continue,
            };
            let is_checkpoint = seq_no.into_inner() % checkpoint_interval == 0;
            self.emit_commit(q_entry, is_checkpoint);
            if is_checkpoint {
                self.checkpoint_pending = Some(seq_no);
            }
        }
    }

    fn maybe_release_checkpoint(&mut self, seq_no: SeqNo) {
        if self.checkpoint_tracker.is_stable(seq_no) {
            self.log.truncate(seq_no);
            self.checkpoint_tracker.truncate(seq_no);
        }
    }

    /// Returns a reference to the persisted log, for hosts inspecting
    /// committed state between ticks.
    pub fn log(&self) -> &PersistedLog {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatchParameters;
    use crate::identifiers::BucketId;

    fn single_node_core() -> StateMachineCore {
        let config = Config {
            id: NodeId::from(0),
            batch_parameters: BatchParameters { cut_size_bytes: 1 },
        };
        let network_config = NetworkConfig::new(1, 0, 10);
        let mut leaders = collections::hash_map();
        leaders.insert(BucketId::from(0), NodeId::from(0));
        let epoch_config = EpochConfig::new(Epoch::from(0), leaders);
        StateMachineCore::new(config, network_config, epoch_config)
    }

    fn digest(byte: u8) -> Digest {
        Digest::from_bytes(&[byte; Digest::LENGTH][..]).unwrap()
    }

    #[test]
    fn single_batch_commits_end_to_end() {
        let mut core = single_node_core();

        core.propose(ClientId::from(1), 1, vec![1, 2, 3]);
        let actions = core.ready();
        assert_eq!(actions.hash_requests.len(), 1);

        core.add_results(ActionResults {
            digests: vec![crate::actions::HashResult {
                digest: digest(1),
                request: HashRequest {
                    origin: HashOrigin::Request { client_id: ClientId::from(1), req_no: 1 },
                },
            }],
            checkpoints: vec![],
        });
        core.ready();

        core.tick();
        let actions = core.ready();
        assert_eq!(actions.broadcasts.len(), 1);

        let (seq_no, epoch) = match &actions.broadcasts[0] {
            Msg::PrePrepare { seq_no, epoch, .. } => (*seq_no, *epoch),
            _ => panic!("expected PrePrepare"),
        };

        core.add_results(ActionResults {
            digests: vec![crate::actions::HashResult {
                digest: digest(9),
                request: HashRequest { origin: HashOrigin::Batch { seq_no, epoch } },
            }],
            checkpoints: vec![],
        });
        let actions = core.ready();
        assert!(actions.broadcasts.iter().any(|m| matches!(m, Msg::Prepare { .. })));

        // single node: its own prepare/commit votes already reach
        // quorum (n=1, f=0).
        assert_eq!(core.log().p_entry(seq_no).unwrap().digest, digest(9));
        assert_eq!(core.log().last_committed(), seq_no);
    }

    #[test]
    #[should_panic]
    fn non_contiguous_commit_is_fatal() {
        let mut core = single_node_core();
        core.log.set_last_committed(SeqNo::from(1));
        core.log.set_last_committed(SeqNo::from(3));
    }

    fn multi_node_core(n: usize, f: usize) -> StateMachineCore {
        let config = Config {
            id: NodeId::from(0),
            batch_parameters: BatchParameters { cut_size_bytes: 1 },
        };
        let network_config = NetworkConfig::new(n, f, 10);
        let mut leaders = collections::hash_map();
        leaders.insert(BucketId::from(0), NodeId::from(0));
        let epoch_config = EpochConfig::new(Epoch::from(0), leaders);
        StateMachineCore::new(config, network_config, epoch_config)
    }

    #[test]
    fn verify_batch_matching_digest_admits_forwarded_batch() {
        // n=4, f=1 -> quorum=3, so a single Prepare vote below fixes the
        // slot's expected digest without finalizing anything.
        let mut core = multi_node_core(4, 1);
        let seq_no = SeqNo::from(1);
        let epoch = Epoch::from(0);
        let expected = digest(5);

        core.step(NodeId::from(1), Msg::Prepare { seq_no, epoch, digest: expected });
        core.ready();

        let acks = vec![crate::message::RequestAck { client_id: ClientId::from(1), req_no: 1, digest: expected }];
        core.step(NodeId::from(2), Msg::ForwardBatch {
            source: NodeId::from(9),
            seq_no,
            epoch,
            request_acks: acks,
        });
        let actions = core.ready();
        assert_eq!(actions.hash_requests.len(), 1);
        match &actions.hash_requests[0].origin {
            HashOrigin::VerifyBatch { source, expected_digest, .. } => {
                assert_eq!(*source, NodeId::from(9));
                assert_eq!(*expected_digest, expected);
            }
            other => panic!("expected VerifyBatch origin, got {:?}", other),
        }

        core.add_results(ActionResults {
            digests: vec![crate::actions::HashResult {
                digest: expected,
                request: actions.hash_requests[0].clone(),
            }],
            checkpoints: vec![],
        });
        core.ready();

        assert!(core.slots.get(&(seq_no, epoch)).unwrap().request_acks.is_some());
        assert!(core.suspects().is_empty());
    }

    #[test]
    fn verify_batch_mismatch_marks_source_suspect() {
        let mut core = multi_node_core(4, 1);
        let seq_no = SeqNo::from(1);
        let epoch = Epoch::from(0);
        let expected = digest(5);

        core.step(NodeId::from(1), Msg::Prepare { seq_no, epoch, digest: expected });
        core.ready();

        core.step(NodeId::from(2), Msg::ForwardBatch {
            source: NodeId::from(9),
            seq_no,
            epoch,
            request_acks: vec![],
        });
        let actions = core.ready();

        core.add_results(ActionResults {
            digests: vec![crate::actions::HashResult {
                digest: digest(0xEE),
                request: actions.hash_requests[0].clone(),
            }],
            checkpoints: vec![],
        });
        core.ready();

        assert!(core.suspects().contains(&NodeId::from(9)));
        assert!(core.slots.get(&(seq_no, epoch)).unwrap().request_acks.is_none());
    }

    #[test]
    fn verify_request_matching_digest_admits_forwarded_payload() {
        let mut core = single_node_core();
        let client = ClientId::from(7);
        let expected = digest(3);

        core.step(
            NodeId::from(1),
            Msg::RequestAck(crate::message::RequestAck { client_id: client, req_no: 1, digest: expected }),
        );
        core.ready();

        core.step(
            NodeId::from(9),
            Msg::ForwardRequest(crate::message::ClientRequest {
                client_id: client,
                req_no: 1,
                data: vec![1, 2, 3],
            }),
        );
        let actions = core.ready();
        assert_eq!(actions.hash_requests.len(), 1);
        match &actions.hash_requests[0].origin {
            HashOrigin::VerifyRequest { source, expected_digest, .. } => {
                assert_eq!(*source, NodeId::from(9));
                assert_eq!(*expected_digest, expected);
            }
            other => panic!("expected VerifyRequest origin, got {:?}", other),
        }

        core.add_results(ActionResults {
            digests: vec![crate::actions::HashResult {
                digest: expected,
                request: actions.hash_requests[0].clone(),
            }],
            checkpoints: vec![],
        });
        core.ready();

        assert_eq!(
            core.client_windows.window(client).unwrap().request(1).unwrap().data(),
            Some(&[1, 2, 3][..]),
        );
        assert!(core.suspects().is_empty());
    }

    #[test]
    fn verify_request_mismatch_marks_source_suspect() {
        let mut core = single_node_core();
        let client = ClientId::from(7);
        let expected = digest(3);

        core.step(
            NodeId::from(1),
            Msg::RequestAck(crate::message::RequestAck { client_id: client, req_no: 1, digest: expected }),
        );
        core.ready();

        core.step(
            NodeId::from(9),
            Msg::ForwardRequest(crate::message::ClientRequest {
                client_id: client,
                req_no: 1,
                data: vec![9, 9, 9],
            }),
        );
        let actions = core.ready();

        core.add_results(ActionResults {
            digests: vec![crate::actions::HashResult {
                digest: digest(0xEE),
                request: actions.hash_requests[0].clone(),
            }],
            checkpoints: vec![],
        });
        core.ready();

        assert!(core.suspects().contains(&NodeId::from(9)));
        assert!(core.client_windows.window(client).unwrap().request(1).unwrap().data().is_none());
    }
}
