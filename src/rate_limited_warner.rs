//! Coalesced warnings for messages dropped at the producer boundary.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use log::warn;

use crate::clock::{TimeProvider, system_clock};

/// Default interval between dropped-message warnings.
pub const DEFAULT_WARN_INTERVAL: Duration = Duration::from_secs(5);

/// Counts dropped messages and reports them at most once per interval.
///
/// Producers call [`record_drop`](Self::record_drop) on every drop. The first
/// drop is reported at once; later drops accumulate until the interval has
/// passed. [`flush`](Self::flush) reports whatever is still pending, which
/// the transport does on close.
pub struct RateLimitedWarner {
    subject: String,
    interval: u64,
    last_warn: AtomicU64,
    pending: AtomicU64,
    clock: TimeProvider,
}

impl RateLimitedWarner {
    pub fn new(subject: impl Into<String>, interval: Duration) -> Self {
        Self::with_clock(subject, interval, system_clock())
    }

    pub fn with_clock(subject: impl Into<String>, interval: Duration, clock: TimeProvider) -> Self {
        let interval = interval.as_secs();
        let now = clock();
        Self {
            subject: subject.into(),
            interval,
            last_warn: AtomicU64::new(now.saturating_sub(interval)),
            pending: AtomicU64::new(0),
            clock,
        }
    }

    /// Count one dropped message, warning if the interval has elapsed.
    ///
    /// Returns the number of drops reported, if a warning was emitted.
    pub fn record_drop(&self) -> Option<u64> {
        self.pending.fetch_add(1, Ordering::Relaxed);
        let now = (self.clock)();
        let prev = self.last_warn.load(Ordering::Relaxed);
        if now.saturating_sub(prev) < self.interval {
            return None;
        }
        // Only the thread that claims this interval reports it.
        self.last_warn
            .compare_exchange(prev, now, Ordering::AcqRel, Ordering::Relaxed)
            .ok()?;
        self.report()
    }

    /// Warn about any drops not yet reported.
    pub fn flush(&self) -> Option<u64> {
        let reported = self.report()?;
        self.last_warn.store((self.clock)(), Ordering::Relaxed);
        Some(reported)
    }

    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }

    fn report(&self) -> Option<u64> {
        let count = self.pending.swap(0, Ordering::Relaxed);
        if count == 0 {
            return None;
        }
        warn!("{}: buffer full, dropped {count} messages", self.subject);
        Some(count)
    }
}

impl std::fmt::Debug for RateLimitedWarner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedWarner")
            .field("subject", &self.subject)
            .field("interval", &self.interval)
            .field("pending", &self.pending())
            .finish()
    }
}
