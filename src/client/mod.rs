//! Client request admission and windowing.
//!
//! The core depends on client-window reordering only to the extent the
//! `Proposer` needs to drain "strong", uncommitted requests in order
//! without gaps. Full window sliding (advancing `low_watermark`/
//! `high_watermark` as requests commit) is part of the larger,
//! unmodeled machinery; this module implements enough of it that the
//! Proposer's consumption loop is correct and testable in isolation.

use crate::collections::{self, HashMap};
use crate::digest::Digest;
use crate::identifiers::{ClientId, NodeId};
use crate::message::ClientRequest;

/// One client request's progress towards becoming "strong".
pub struct Tracked {
    data: Option<Vec<u8>>,
    digest: Option<Digest>,
    acks: crate::collections::HashSet<NodeId>,
    /// Set once this request has committed under some earlier epoch —
    /// the Proposer must not re-propose it.
    pub committed: bool,
}

impl Tracked {
    fn new() -> Self {
        Tracked {
            data: None,
            digest: None,
            acks: collections::hash_set(),
            committed: false,
        }
    }

    /// True once a quorum of replicas (including, by convention, this
    /// one once it has acked its own digest) has vouched for this
    /// request's digest and the payload itself is known locally.
    pub fn is_strong(&self, quorum: usize) -> bool {
        self.data.is_some() && self.digest.is_some() && self.acks.len() >= quorum
    }

    /// The request's payload, once known.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// The request's canonical digest, once known.
    pub fn digest(&self) -> Option<Digest> {
        self.digest
    }
}

/// The admissible request-number range for one client, and the
/// per-request strength tracking the Proposer reads.
pub struct ClientWindow {
    pub low_watermark: u64,
    pub high_watermark: u64,
    requests: HashMap<u64, Tracked>,
}

impl ClientWindow {
    /// Builds a new window admitting request numbers in
    /// `[low_watermark, high_watermark]`.
    pub fn new(low_watermark: u64, high_watermark: u64) -> Self {
        ClientWindow {
            low_watermark,
            high_watermark,
            requests: collections::hash_map(),
        }
    }

    /// Admits `request`'s payload at `req_no`, creating the tracking
    /// slot if this is the first time it is seen.
    pub fn admit(&mut self, req_no: u64, data: Vec<u8>) {
        let tracked = self.requests.entry(req_no).or_insert_with(Tracked::new);
        tracked.data = Some(data);
    }

    /// Records the canonical digest computed for `req_no`'s payload.
    pub fn set_digest(&mut self, req_no: u64, digest: Digest) {
        self.requests.entry(req_no).or_insert_with(Tracked::new).digest = Some(digest);
    }

    /// Records that `voter` acknowledged `req_no`'s digest.
    pub fn ack(&mut self, req_no: u64, voter: NodeId) {
        self.requests
            .entry(req_no)
            .or_insert_with(Tracked::new)
            .acks
            .insert(voter);
    }

    /// Marks `req_no` as already committed under an earlier epoch.
    pub fn mark_committed(&mut self, req_no: u64) {
        self.requests.entry(req_no).or_insert_with(Tracked::new).committed = true;
    }

    /// The tracked state for `req_no`, if any request has been seen at
    /// that number.
    pub fn request(&self, req_no: u64) -> Option<&Tracked> {
        self.requests.get(&req_no)
    }
}

/// Constructs a `ClientRequest` out of raw admitted fields, the shape
/// `Propose` hands inward.
pub fn client_request(client_id: ClientId, req_no: u64, data: Vec<u8>) -> ClientRequest {
    ClientRequest { client_id, req_no, data }
}

/// The registry of all clients' windows, held in a deterministic
/// (insertion) order so iteration over "all clients" never depends on
/// hashing.
#[derive(Default)]
pub struct ClientWindows {
    clients: Vec<ClientId>,
    windows: HashMap<ClientId, ClientWindow>,
}

impl ClientWindows {
    pub fn new() -> Self {
        ClientWindows {
            clients: Vec::new(),
            windows: collections::hash_map(),
        }
    }

    /// Returns the ids of every known client, in the order they were
    /// first seen.
    pub fn clients(&self) -> &[ClientId] {
        &self.clients[..]
    }

    /// Returns the window for `client_id`, creating a fresh one
    /// (admitting request numbers starting at 1) if this is the first
    /// time the client is seen.
    pub fn window_mut(&mut self, client_id: ClientId) -> &mut ClientWindow {
        if !self.windows.contains_key(&client_id) {
            self.clients.push(client_id);
            self.windows
                .insert(client_id, ClientWindow::new(1, u64::MAX));
        }
        self.windows.get_mut(&client_id).unwrap()
    }

    /// Returns the window for `client_id`, if the client has been seen
    /// before.
    pub fn window(&self, client_id: ClientId) -> Option<&ClientWindow> {
        self.windows.get(&client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_strong_once_quorum_acks_and_data_known() {
        let mut window = ClientWindow::new(1, 100);
        window.admit(1, vec![1, 2, 3]);
        window.set_digest(1, Digest::from_bytes(&[7u8; Digest::LENGTH][..]).unwrap());
        window.ack(1, NodeId::from(0));
        assert!(!window.request(1).unwrap().is_strong(2));
        window.ack(1, NodeId::from(1));
        assert!(window.request(1).unwrap().is_strong(2));
    }

    #[test]
    fn duplicate_ack_does_not_inflate_count() {
        let mut window = ClientWindow::new(1, 100);
        window.admit(1, vec![1]);
        window.ack(1, NodeId::from(0));
        window.ack(1, NodeId::from(0));
        assert!(!window.request(1).unwrap().is_strong(2));
    }

    #[test]
    fn windows_track_clients_in_first_seen_order() {
        let mut windows = ClientWindows::new();
        windows.window_mut(ClientId::from(5));
        windows.window_mut(ClientId::from(1));
        windows.window_mut(ClientId::from(5));
        assert_eq!(
            windows.clients(),
            &[ClientId::from(5), ClientId::from(1)][..],
        );
    }
}
