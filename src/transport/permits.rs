//! Counting semaphore bounding concurrent sends.
//!
//! Permits are unit values held in a [`BoundedQueue`]: acquiring puts one in,
//! releasing takes one out, so at most `limit` permits exist at once. The
//! current and peak number of holders are tracked for [`TransportStats`].
//!
//! [`TransportStats`]: super::TransportStats

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use crate::queue::BoundedQueue;

pub(crate) struct SendPermits {
    slots: BoundedQueue<()>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SendPermits {
    pub(crate) fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            slots: BoundedQueue::new(limit, Duration::ZERO),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    /// Wait up to `timeout` for a free permit.
    pub(crate) fn acquire(self: &Arc<Self>, timeout: Duration) -> Option<Permit> {
        self.slots.put_timeout((), timeout).ok()?;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Some(Permit {
            permits: Arc::clone(self),
        })
    }

    pub(crate) fn limit(&self) -> usize {
        self.slots.capacity()
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// One held permit, released on drop.
pub(crate) struct Permit {
    permits: Arc<SendPermits>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.permits.in_flight.fetch_sub(1, Ordering::SeqCst);
        let _ = self.permits.slots.try_get();
    }
}
