//! Partitions client requests across parallel buckets and assembles
//! byte-bounded batches for the buckets this replica leads.

use crate::client::ClientWindows;
use crate::collections::{self, HashMap};
use crate::identifiers::{BucketId, ClientId};
use crate::message::RequestAck;

/// One client request queued for proposing: its ack certificate and
/// payload size, enough for the batch-assembly byte count.
pub struct QueuedRequest {
    pub ack: RequestAck,
    pub size_bytes: usize,
}

struct ProposalBucket {
    queue: Vec<QueuedRequest>,
    size_bytes: usize,
    pending: Vec<Vec<QueuedRequest>>,
}

impl ProposalBucket {
    fn new() -> Self {
        ProposalBucket { queue: Vec::new(), size_bytes: 0, pending: Vec::new() }
    }
}

struct ClientWindowProcessor {
    last_processed: u64,
}

/// Drains committed-order-ready, strong client requests from each
/// client window, bucketing them and sealing byte-bounded batches for
/// buckets this replica leads.
pub struct Proposer {
    cut_size_bytes: usize,
    total_buckets: u64,
    /// Number of distinct acks a request needs to be considered
    /// strong (`2f + 1`).
    quorum: usize,
    proposal_buckets: HashMap<BucketId, ProposalBucket>,
    client_window_processors: HashMap<ClientId, ClientWindowProcessor>,
    /// Round-robin cursor into `ClientWindows::clients()`: favors
    /// whichever client was served least recently, not always the
    /// lowest id.
    next_client_cursor: usize,
}

impl Proposer {
    /// Builds a new `Proposer` leading exactly the buckets in
    /// `led_buckets`, cutting batches at `cut_size_bytes`, treating a
    /// request as strong once it has `quorum` distinct acks.
    pub fn new(
        cut_size_bytes: usize,
        total_buckets: u64,
        quorum: usize,
        led_buckets: &[BucketId],
    ) -> Self {
        let mut proposal_buckets = collections::hash_map();
        for bucket in led_buckets {
            proposal_buckets.insert(*bucket, ProposalBucket::new());
        }

        Proposer {
            cut_size_bytes,
            total_buckets,
            quorum,
            proposal_buckets,
            client_window_processors: collections::hash_map(),
            next_client_cursor: 0,
        }
    }

    /// Steps every known client window once, in round-robin order
    /// starting from the cursor left off by the previous call.
    pub fn step_all_client_windows(&mut self, windows: &mut ClientWindows) {
        let clients = windows.clients().to_vec();
        if clients.is_empty() {
            return;
        }

        self.next_client_cursor %= clients.len();
        for i in 0..clients.len() {
            let idx = (self.next_client_cursor + i) % clients.len();
            self.step_client_window(windows, clients[idx]);
        }
        self.next_client_cursor = (self.next_client_cursor + 1) % clients.len();
    }

    /// Advances `client_id`'s cursor as far as strong, data-bearing,
    /// uncommitted requests allow, bucketing each one this replica
    /// leads and sealing pending batches at the byte threshold.
    ///
    /// Fatal if `client_id` is not a known client — the caller must
    /// only ever name clients `ClientWindows` already tracks.
    pub fn step_client_window(&mut self, windows: &mut ClientWindows, client_id: ClientId) {
        let window = windows
            .window(client_id)
            .unwrap_or_else(|| panic!("unexpected, missing client {:?}", client_id));

        let high_watermark = window.high_watermark;
        let low_watermark = window.low_watermark;

        self.client_window_processors
            .entry(client_id)
            .or_insert_with(|| ClientWindowProcessor { last_processed: low_watermark - 1 });

        loop {
            let processor = self.client_window_processors.get(&client_id).unwrap();
            if processor.last_processed >= high_watermark {
                break;
            }
            let req_no = processor.last_processed + 1;

            let (digest, data_len, committed) = {
                let window = windows.window(client_id).unwrap();
                let request = match window.request(req_no) {
                    Some(r) => r,
                    None => break,
                };
                if !request_is_strong(windows, client_id, req_no, self.quorum) {
                    break;
                }
                let data_len = request.data().unwrap().len();
                (request.digest().unwrap(), data_len, request.committed)
            };

            self.client_window_processors.get_mut(&client_id).unwrap().last_processed = req_no;

            // TODO: offset the bucket id by something derived from the
            // client id, so requests from different clients don't all
            // start out competing for bucket 0.
            let bucket = BucketId::of(req_no, self.total_buckets);

            let proposal_bucket = match self.proposal_buckets.get_mut(&bucket) {
                Some(b) => b,
                None => continue, // we don't lead this bucket this epoch
            };

            if committed {
                // already proposed by another node in a previous epoch
                continue;
            }

            proposal_bucket.queue.push(QueuedRequest {
                ack: RequestAck { client_id, req_no, digest },
                size_bytes: data_len,
            });
            proposal_bucket.size_bytes += data_len;

            if proposal_bucket.size_bytes >= self.cut_size_bytes {
                let sealed = std::mem::take(&mut proposal_bucket.queue);
                proposal_bucket.pending.push(sealed);
                proposal_bucket.size_bytes = 0;
            }
        }
    }

    /// True if `bucket` has anything queued or sealed, pending
    /// proposal.
    pub fn has_outstanding(&self, bucket: BucketId) -> bool {
        self.proposal_buckets
            .get(&bucket)
            .map(|b| !b.queue.is_empty() || !b.pending.is_empty())
            .unwrap_or(false)
    }

    /// True if `bucket` has a fully sealed batch ready.
    pub fn has_pending(&self, bucket: BucketId) -> bool {
        self.proposal_buckets
            .get(&bucket)
            .map(|b| !b.pending.is_empty())
            .unwrap_or(false)
    }

    /// Returns the next batch of acks to propose for `bucket`: the
    /// oldest sealed batch if one exists, otherwise a partial flush of
    /// the queue.
    ///
    /// Fatal if nothing is outstanding for `bucket` — the caller must
    /// check `has_outstanding` first.
    pub fn next(&mut self, bucket: BucketId) -> Vec<RequestAck> {
        let proposal_bucket = self
            .proposal_buckets
            .get_mut(&bucket)
            .unwrap_or_else(|| panic!("called next() on a bucket we don't lead: {:?}", bucket));

        if !proposal_bucket.pending.is_empty() {
            let batch = proposal_bucket.pending.remove(0);
            return batch.into_iter().map(|q| q.ack).collect();
        }

        if !proposal_bucket.queue.is_empty() {
            let batch = std::mem::take(&mut proposal_bucket.queue);
            proposal_bucket.size_bytes = 0;
            return batch.into_iter().map(|q| q.ack).collect();
        }

        panic!("called next() when nothing outstanding for bucket {:?}", bucket);
    }
}

fn request_is_strong(windows: &ClientWindows, client_id: ClientId, req_no: u64, quorum: usize) -> bool {
    windows
        .window(client_id)
        .and_then(|w| w.request(req_no))
        .map(|r| r.is_strong(quorum))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientWindows;
    use crate::digest::Digest;
    use crate::identifiers::NodeId;

    fn digest(byte: u8) -> Digest {
        Digest::from_bytes(&[byte; Digest::LENGTH][..]).unwrap()
    }

    fn strong_request(windows: &mut ClientWindows, client: ClientId, req_no: u64, data: Vec<u8>) {
        let window = windows.window_mut(client);
        window.admit(req_no, data);
        let digest = digest(req_no as u8);
        window.set_digest(req_no, digest);
        window.ack(req_no, NodeId::from(0));
        window.ack(req_no, NodeId::from(1));
    }

    #[test]
    fn single_batch_commit_scenario() {
        let mut windows = ClientWindows::new();
        strong_request(&mut windows, ClientId::from(1), 1, vec![0xAA, 0xBB, 0xCC, 0xDD]);

        let mut proposer = Proposer::new(4, 1, 2, &[BucketId::from(0)]);
        proposer.step_all_client_windows(&mut windows);

        assert!(proposer.has_pending(BucketId::from(0)));
        let batch = proposer.next(BucketId::from(0));
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].req_no, 1);
        assert!(!proposer.has_outstanding(BucketId::from(0)));
    }

    #[test]
    fn byte_threshold_seals_mid_request() {
        let mut windows = ClientWindows::new();
        strong_request(&mut windows, ClientId::from(1), 1, vec![1, 2, 3]);
        strong_request(&mut windows, ClientId::from(1), 2, vec![4, 5, 6]);

        let mut proposer = Proposer::new(5, 1, 2, &[BucketId::from(0)]);

        proposer.step_client_window(&mut windows, ClientId::from(1));

        assert!(proposer.has_pending(BucketId::from(0)));
        let batch = proposer.next(BucketId::from(0));
        assert_eq!(batch.len(), 2);
        assert!(!proposer.has_outstanding(BucketId::from(0)));
    }

    #[test]
    fn exact_threshold_seals_batch() {
        let mut windows = ClientWindows::new();
        strong_request(&mut windows, ClientId::from(1), 1, vec![1, 2, 3, 4]);

        let mut proposer = Proposer::new(4, 1, 2, &[BucketId::from(0)]);
        proposer.step_client_window(&mut windows, ClientId::from(1));

        assert!(proposer.has_pending(BucketId::from(0)));
    }

    #[test]
    fn stepping_with_nothing_new_is_a_no_op() {
        let mut windows = ClientWindows::new();
        strong_request(&mut windows, ClientId::from(1), 1, vec![1, 2, 3, 4]);

        let mut proposer = Proposer::new(4, 1, 2, &[BucketId::from(0)]);
        proposer.step_client_window(&mut windows, ClientId::from(1));
        proposer.next(BucketId::from(0));

        // nothing new admitted; stepping again must not panic or
        // surface another batch.
        proposer.step_client_window(&mut windows, ClientId::from(1));
        assert!(!proposer.has_outstanding(BucketId::from(0)));
    }

    #[test]
    #[should_panic]
    fn next_on_empty_bucket_is_fatal() {
        let mut proposer = Proposer::new(4, 1, 2, &[BucketId::from(0)]);
        proposer.next(BucketId::from(0));
    }

    #[test]
    fn round_robin_cursor_advances_across_clients() {
        let mut windows = ClientWindows::new();
        strong_request(&mut windows, ClientId::from(1), 1, vec![1]);
        strong_request(&mut windows, ClientId::from(2), 1, vec![1]);

        let mut proposer = Proposer::new(1000, 2, 2, &[BucketId::from(0), BucketId::from(1)]);
        proposer.step_all_client_windows(&mut windows);
        assert_eq!(proposer.next_client_cursor, 1);
        proposer.step_all_client_windows(&mut windows);
        assert_eq!(proposer.next_client_cursor, 0);
    }
}
