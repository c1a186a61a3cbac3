//! Wire-message and persisted-log-entry data types.
//!
//! Field-level wire layout is left open beyond the semantics required
//! for determinism; these types only need to be canonically
//! serializable (hence the `serialize_serde` derives) for a host to
//! hash and persist them reproducibly. This crate never serializes
//! them itself.

use crate::digest::Digest;
use crate::identifiers::{ClientId, NodeId};
use crate::ordering::{Epoch, Orderable, SeqNo};

#[cfg(feature = "serialize_serde")]
use serde::{Deserialize, Serialize};

/// Acknowledges a client request's canonical digest.
///
/// `RequestAck`s accumulate in a `QEntry` as evidence that a batch's
/// requests are agreed upon, and are exchanged directly as wire
/// traffic while a request is becoming "strong".
#[cfg_attr(feature = "serialize_serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequestAck {
    pub client_id: ClientId,
    pub req_no: u64,
    pub digest: Digest,
}

/// A client request, as carried over the wire or admitted locally.
#[cfg_attr(feature = "serialize_serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct ClientRequest {
    pub client_id: ClientId,
    pub req_no: u64,
    #[cfg_attr(feature = "serialize_serde", serde(with = "serde_bytes"))]
    pub data: Vec<u8>,
}

/// Prepared entry: evidence this replica accepted a digest for a
/// `SeqNo` in a given epoch.
#[cfg_attr(feature = "serialize_serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PEntry {
    pub seq_no: SeqNo,
    pub epoch: Epoch,
    pub digest: Digest,
}

impl Orderable for PEntry {
    fn sequence_number(&self) -> SeqNo {
        self.seq_no
    }
}

/// Pre-prepared / proposed entry: a proposal for a `SeqNo` under a
/// given epoch, binding a digest to a set of request acknowledgments.
#[cfg_attr(feature = "serialize_serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QEntry {
    pub seq_no: SeqNo,
    pub epoch: Epoch,
    pub digest: Digest,
    pub request_acks: Vec<RequestAck>,
}

impl Orderable for QEntry {
    fn sequence_number(&self) -> SeqNo {
        self.seq_no
    }
}

/// A local checkpoint: an opaque application-state summary at a given
/// `SeqNo`, which is always a multiple of the checkpoint interval (or
/// the synthesized `SeqNo = 0` checkpoint).
#[cfg_attr(feature = "serialize_serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Checkpoint {
    pub seq_no: SeqNo,
    #[cfg_attr(feature = "serialize_serde", serde(with = "serde_bytes"))]
    pub value: Vec<u8>,
}

impl Orderable for Checkpoint {
    fn sequence_number(&self) -> SeqNo {
        self.seq_no
    }
}

/// One `{SeqNo, Epoch, Digest}` entry as carried in epoch-change
/// evidence (both the P-set and Q-set sections).
#[cfg_attr(feature = "serialize_serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SetEntry {
    pub seq_no: SeqNo,
    pub epoch: Epoch,
    pub digest: Digest,
}

/// The variant tag distinguishing entries the consumer persists and
/// replays.
#[cfg_attr(feature = "serialize_serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub enum PersistedEntry {
    PEntry(PEntry),
    QEntry(QEntry),
    Checkpoint(Checkpoint),
}

/// The epoch-change evidence message assembled by
/// `PersistedLog::construct_epoch_change`.
#[cfg_attr(feature = "serialize_serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct EpochChange {
    pub new_epoch: Epoch,
    pub checkpoints: Vec<Checkpoint>,
    pub q_set: Vec<SetEntry>,
    pub p_set: Vec<SetEntry>,
}

/// The wire-message types the state machine produces and consumes.
///
/// Field-level layout must be canonical (deterministic serialization)
/// because digests are computed over it, but this crate leaves the
/// actual serialization to the host.
#[cfg_attr(feature = "serialize_serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub enum Msg {
    /// The leader's proposal for a `SeqNo`, before the batch digest is
    /// known to the rest of the cluster.
    PrePrepare {
        seq_no: SeqNo,
        epoch: Epoch,
        request_acks: Vec<RequestAck>,
    },
    /// A replica's vote that it has accepted a `PrePrepare`'s digest.
    Prepare {
        seq_no: SeqNo,
        epoch: Epoch,
        digest: Digest,
    },
    /// A replica's vote that it has gathered a prepare certificate.
    Commit {
        seq_no: SeqNo,
        epoch: Epoch,
        digest: Digest,
    },
    /// A replica vouching for the application-state summary at a
    /// given `SeqNo`.
    Checkpoint {
        seq_no: SeqNo,
        #[cfg_attr(feature = "serialize_serde", serde(with = "serde_bytes"))]
        value: Vec<u8>,
    },
    /// This replica's epoch-change evidence.
    EpochChange {
        origin: NodeId,
        payload: EpochChange,
    },
    /// Installs a new epoch's bucket/leader assignment.
    NewEpoch {
        epoch: Epoch,
    },
    /// Acknowledges a client request's canonical digest.
    RequestAck(RequestAck),
    /// Forwards a full client request body to a replica that is
    /// missing it.
    ForwardRequest(ClientRequest),
    /// Forwards a full batch's requests to a replica that is missing
    /// them, to be verified against an expected digest.
    ForwardBatch {
        source: NodeId,
        seq_no: SeqNo,
        epoch: Epoch,
        request_acks: Vec<RequestAck>,
    },
}

#[cfg(all(test, feature = "serialize_serde"))]
mod tests {
    use super::*;
    use crate::digest::Digest;

    fn digest(byte: u8) -> Digest {
        Digest::from_bytes(&[byte; Digest::LENGTH][..]).unwrap()
    }

    // the field-level layout of persisted entries and wire messages
    // must be canonical, since a host hashes and persists them via
    // whatever `serde` format it picks; bincode stands in for that here.
    #[test]
    fn persisted_entry_round_trips_through_bincode() {
        let entry = PersistedEntry::QEntry(QEntry {
            seq_no: SeqNo::from(42),
            epoch: Epoch::from(2),
            digest: digest(9),
            request_acks: vec![RequestAck {
                client_id: crate::identifiers::ClientId::from(1),
                req_no: 7,
                digest: digest(1),
            }],
        });

        let bytes = bincode::serialize(&entry).unwrap();
        let decoded: PersistedEntry = bincode::deserialize(&bytes).unwrap();

        match (entry, decoded) {
            (PersistedEntry::QEntry(a), PersistedEntry::QEntry(b)) => assert_eq!(a, b),
            _ => panic!("round-trip changed variant"),
        }
    }

}
