//! The persisted log: the authoritative in-memory shadow of the
//! durable write-ahead log.
//!
//! Owns the P-set, Q-set, checkpoint map, and the last-committed
//! pointer; answers epoch-change queries; allows truncation at a
//! stable checkpoint. This module carries no I/O of its own — `load`
//! drives a consumer-supplied `Storage`, and every mutator returns the
//! `Action::Persist` the caller must honor before releasing any
//! message that depends on it.

use crate::checkpoint::CheckpointTracker;
use crate::collections::{self, HashMap};
use crate::error::*;
use crate::message::{Checkpoint, EpochChange, PEntry, PersistedEntry, QEntry, SetEntry};
use crate::ordering::{Epoch, Orderable, SeqNo};

/// What `Storage::load` reports for a given index.
pub enum LoadStatus {
    /// The entry stored at this index.
    Entry(PersistedEntry),
    /// No more entries; replay is complete.
    EndOfStream,
}

/// The durable storage interface this crate consumes. Indices start at
/// 0 and increase by one; end-of-stream is a signal, not an error.
pub trait Storage {
    fn load(&mut self, index: u64) -> Result<LoadStatus>;
}

/// The authoritative in-memory shadow of the durable write-ahead log.
pub struct PersistedLog {
    p_set: HashMap<SeqNo, PEntry>,
    q_set: HashMap<SeqNo, HashMap<Epoch, QEntry>>,
    checkpoints: HashMap<SeqNo, Checkpoint>,
    last_committed: SeqNo,
    checkpoint_interval: u64,
}

impl PersistedLog {
    /// Builds an empty `PersistedLog`. `checkpoint_interval` is the
    /// `NetworkConfig`-provided SeqNo stride between checkpoints, used
    /// only to size the epoch-change evidence window.
    pub fn new(checkpoint_interval: u64) -> Self {
        PersistedLog {
            p_set: collections::hash_map(),
            q_set: collections::hash_map(),
            checkpoints: collections::hash_map(),
            last_committed: SeqNo::ZERO,
            checkpoint_interval,
        }
    }

    /// Replays entries from `storage` by ascending index until
    /// end-of-stream, then installs the synthetic `SeqNo = 0`
    /// checkpoint if no real one was replayed. A storage error is
    /// fatal to startup.
    pub fn load<S: Storage>(&mut self, storage: &mut S) -> Result<()> {
        let mut index = 0u64;
        loop {
            match storage.load(index)? {
                LoadStatus::EndOfStream => break,
                LoadStatus::Entry(entry) => {
                    self.add(entry);
                    index += 1;
                }
            }
        }

        if !self.checkpoints.contains_key(&SeqNo::ZERO) {
            self.checkpoints.insert(
                SeqNo::ZERO,
                Checkpoint {
                    seq_no: SeqNo::ZERO,
                    value: GENESIS_CHECKPOINT_PLACEHOLDER.to_vec(),
                },
            );
        }

        Ok(())
    }

    /// Dispatches `entry` to the matching add-method. An unrecognized
    /// variant would be a programmer error; since `PersistedEntry` is a
    /// closed enum this is unreachable by construction.
    pub fn add(&mut self, entry: PersistedEntry) {
        match entry {
            PersistedEntry::PEntry(p) => self.add_p_entry(p),
            PersistedEntry::QEntry(q) => self.add_q_entry(q),
            PersistedEntry::Checkpoint(c) => self.add_checkpoint(c),
        }
    }

    /// Stores `p_entry`. Fatal if a `PEntry` already exists for this
    /// `SeqNo` with an equal or newer epoch — the invariant is that a
    /// newly stored `PEntry`'s epoch is strictly greater than any
    /// previously stored for that `SeqNo`.
    pub fn add_p_entry(&mut self, p_entry: PEntry) {
        if let Some(old) = self.p_set.get(&p_entry.seq_no) {
            assert!(
                old.epoch < p_entry.epoch,
                "duplicate PEntry at {:?} with epoch {:?} not newer than stored epoch {:?}",
                p_entry.seq_no,
                p_entry.epoch,
                old.epoch,
            );
        }
        self.p_set.insert(p_entry.seq_no, p_entry);
    }

    /// Stores `q_entry`. Multiple `QEntry`s for the same `SeqNo` under
    /// different epochs coexist; the mapping keyed by `(SeqNo, Epoch)`
    /// is overwritten if an identical key is seen again.
    pub fn add_q_entry(&mut self, q_entry: QEntry) {
        self.q_set
            .entry(q_entry.seq_no)
            .or_insert_with(collections::hash_map)
            .insert(q_entry.epoch, q_entry);
    }

    /// Stores `checkpoint`.
    pub fn add_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.checkpoints.insert(checkpoint.seq_no, checkpoint);
    }

    /// Looks up the `QEntry` stored for `(seq_no, epoch)`, if any.
    pub fn q_entry(&self, seq_no: SeqNo, epoch: Epoch) -> Option<&QEntry> {
        self.q_set.get(&seq_no).and_then(|by_epoch| by_epoch.get(&epoch))
    }

    /// Looks up the `PEntry` stored for `seq_no`, if any.
    pub fn p_entry(&self, seq_no: SeqNo) -> Option<&PEntry> {
        self.p_set.get(&seq_no)
    }

    /// Looks up the checkpoint stored for `seq_no`, if any.
    pub fn checkpoint(&self, seq_no: SeqNo) -> Option<&Checkpoint> {
        self.checkpoints.get(&seq_no)
    }

    /// The last sequence number reported as committed.
    pub fn last_committed(&self) -> SeqNo {
        self.last_committed
    }

    /// Advances the last-committed pointer. Fatal unless
    /// `seq_no == last_committed + 1` — a jump is a protocol-violation
    /// bug, not a recoverable condition.
    pub fn set_last_committed(&mut self, seq_no: SeqNo) {
        assert_eq!(
            seq_no,
            self.last_committed.next(),
            "setLastCommitted non-contiguous: last_committed={:?}, got={:?}",
            self.last_committed,
            seq_no,
        );
        self.last_committed = seq_no;
    }

    /// Removes every `PEntry`, `QEntry`, and checkpoint with `SeqNo`
    /// strictly below `low_watermark`. Idempotent.
    pub fn truncate(&mut self, low_watermark: SeqNo) {
        self.p_set.retain(|seq_no, _| *seq_no >= low_watermark);
        self.q_set.retain(|seq_no, _| *seq_no >= low_watermark);
        self.checkpoints.retain(|seq_no, _| *seq_no >= low_watermark);
    }

    /// Assembles the view-change evidence message for `new_epoch`.
    ///
    /// Fatal if no checkpoint is stable according to `tracker` — the
    /// synthetic `SeqNo = 0` checkpoint must always be stable, so this
    /// can only happen if the host never vouched for it.
    pub fn construct_epoch_change(
        &self,
        new_epoch: Epoch,
        tracker: &CheckpointTracker,
    ) -> EpochChange {
        let highest_stable = self
            .checkpoints
            .keys()
            .copied()
            .filter(|seq_no| tracker.is_stable(*seq_no))
            .max()
            .expect("constructEpochChange: no stable checkpoint found");

        // every known checkpoint other than the highest stable one,
        // plus the highest stable one itself, sorted ascending.
        let mut checkpoints: Vec<Checkpoint> = self.checkpoints.values().cloned().collect();
        checkpoints.sort_by_key(|c| c.sequence_number());

        let window_end = SeqNo::from(
            u64::from(highest_stable) + self.checkpoint_interval * 3,
        );

        let mut q_set = Vec::new();
        let mut p_set = Vec::new();

        let mut seq_no = highest_stable;
        while seq_no < window_end {
            if let Some(by_epoch) = self.q_set.get(&seq_no) {
                let mut entries: Vec<&QEntry> = by_epoch.values().collect();
                entries.sort_by_key(|q| q.epoch);
                for q in entries {
                    q_set.push(SetEntry {
                        seq_no: q.seq_no,
                        epoch: q.epoch,
                        digest: q.digest,
                    });
                }
            }

            if let Some(p) = self.p_set.get(&seq_no) {
                p_set.push(SetEntry {
                    seq_no: p.seq_no,
                    epoch: p.epoch,
                    digest: p.digest,
                });
            }

            seq_no = seq_no.next();
        }

        EpochChange { new_epoch, checkpoints, q_set, p_set }
    }
}

/// Placeholder value for the synthetic `SeqNo = 0` checkpoint.
///
/// A production host must overwrite this via its first real
/// `CheckpointResult` — this crate has no application state of its own
/// to ask for the genuine initial state digest.
pub const GENESIS_CHECKPOINT_PLACEHOLDER: &[u8] = b"TODO, get from state";
