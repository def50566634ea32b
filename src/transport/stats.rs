use std::sync::atomic::{AtomicU64, Ordering};

use super::permits::SendPermits;

/// Point-in-time counters describing what the transport has done.
///
/// Messages dropped at the producer boundary and batches lost to disk
/// failures are counted here rather than reported as errors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Messages accepted into the buffer.
    pub accepted: u64,
    /// Messages dropped because the buffer stayed full.
    pub dropped: u64,
    /// Batches written to the collector.
    pub batches_sent: u64,
    /// Batches written to the overflow directory.
    pub batches_spilled: u64,
    /// Overflow files taken back into the send path.
    pub batches_replayed: u64,
    /// Batches that could be neither sent nor spilled.
    pub batches_lost: u64,
    pub in_flight: usize,
    pub peak_in_flight: usize,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) accepted: AtomicU64,
    pub(crate) dropped: AtomicU64,
    pub(crate) batches_sent: AtomicU64,
    pub(crate) batches_spilled: AtomicU64,
    pub(crate) batches_replayed: AtomicU64,
    pub(crate) batches_lost: AtomicU64,
}

impl Counters {
    pub(crate) fn snapshot(&self, permits: &SendPermits) -> TransportStats {
        TransportStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            batches_spilled: self.batches_spilled.load(Ordering::Relaxed),
            batches_replayed: self.batches_replayed.load(Ordering::Relaxed),
            batches_lost: self.batches_lost.load(Ordering::Relaxed),
            in_flight: permits.in_flight(),
            peak_in_flight: permits.peak(),
        }
    }
}

pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}
