//! State shared by the transport handle, the batching thread, and send
//! threads, plus the send path itself: dispatch, emit, spill, and replay.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use crossbeam_utils::sync::WaitGroup;
use log::{debug, error, warn};

use crate::{
    clock::TimeProvider,
    config::TransportConfig,
    error::TransportError,
    overflow::OverflowStore,
    pool::{ConnectionPool, PoolSettings},
    priority::Priority,
    queue::BoundedQueue,
    rate_limited_warner::RateLimitedWarner,
};

use super::{
    permits::SendPermits,
    stats::{Counters, bump},
};

pub(crate) struct Shared {
    pub(crate) addr: String,
    pub(crate) priority: Priority,
    pub(crate) config: TransportConfig,
    pub(crate) buffer: BoundedQueue<Vec<u8>>,
    pub(crate) pool: ConnectionPool,
    pub(crate) permits: Arc<SendPermits>,
    pub(crate) overflow: OverflowStore,
    pub(crate) counters: Counters,
    pub(crate) running: AtomicBool,
    pub(crate) drop_warner: RateLimitedWarner,
}

impl Shared {
    pub(crate) fn new(
        addr: &str,
        priority: Priority,
        config: TransportConfig,
        overflow: OverflowStore,
        clock: TimeProvider,
    ) -> Arc<Self> {
        Arc::new(Self {
            addr: addr.to_owned(),
            priority,
            buffer: BoundedQueue::new(config.buffer_capacity, config.queue_timeout),
            pool: ConnectionPool::new(addr, PoolSettings::from(&config), clock),
            permits: SendPermits::new(config.max_in_flight),
            overflow,
            counters: Counters::default(),
            running: AtomicBool::new(true),
            drop_warner: RateLimitedWarner::new(
                format!("syslog {addr}"),
                config.warn_interval,
            ),
            config,
        })
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Queue one framed message for batching.
    ///
    /// A full buffer drops the message and counts it; only a closed buffer is
    /// reported to the caller.
    pub(crate) fn enqueue(&self, framed: Vec<u8>) -> Result<(), TransportError> {
        match self.buffer.put(framed) {
            Ok(()) => {
                bump(&self.counters.accepted);
                Ok(())
            }
            Err(_) if self.buffer.is_closed() => Err(TransportError::Closed),
            Err(_) => {
                bump(&self.counters.dropped);
                self.drop_warner.record_drop();
                Ok(())
            }
        }
    }

    /// Hand `batch` to a send thread, or spill it when no permit frees up
    /// within the permit timeout.
    ///
    /// The send thread holds its permit and a `tasks` guard until `emit`
    /// returns, so joining `tasks` waits for every dispatched batch.
    pub(crate) fn dispatch(self: &Arc<Self>, batch: Vec<u8>, tasks: &WaitGroup) {
        let Some(permit) = self.permits.acquire(self.config.permit_timeout) else {
            warn!(
                "syslog flow control: {} sends in flight, spilling batch to disk",
                self.permits.limit()
            );
            self.spill(&batch);
            return;
        };
        let batch: Arc<[u8]> = batch.into();
        let payload = Arc::clone(&batch);
        let shared = Arc::clone(self);
        let task = tasks.clone();
        let spawned = thread::Builder::new()
            .name("femtosyslog-send".into())
            .spawn(move || {
                let _permit = permit;
                let _task = task;
                shared.emit(&payload);
            });
        if let Err(err) = spawned {
            error!("failed to start syslog send thread: {err}; spilling batch to disk");
            self.spill(&batch);
        }
    }

    /// Send one batch over a pooled connection, spilling it on any failure.
    pub(crate) fn emit(&self, batch: &[u8]) {
        let Some(mut conn) = self.pool.acquire() else {
            warn!(
                "no syslog connection to {} available; spilling batch to disk",
                self.addr
            );
            self.spill(batch);
            return;
        };
        match conn.send(batch) {
            Ok(()) => {
                bump(&self.counters.batches_sent);
                self.pool.release(conn);
            }
            Err(err) => {
                warn!(
                    "syslog send to {} failed: {err}; spilling batch to disk",
                    self.addr
                );
                conn.close();
                self.spill(batch);
            }
        }
    }

    /// Persist `batch` to the overflow directory.
    pub(crate) fn spill(&self, batch: &[u8]) {
        match self.overflow.persist(batch) {
            Ok(path) => {
                bump(&self.counters.batches_spilled);
                debug!("spilled {} bytes to {}", batch.len(), path.display());
            }
            Err(err) => {
                bump(&self.counters.batches_lost);
                error!(
                    "failed to write syslog overflow file in {}: {err}; {} bytes lost",
                    self.overflow.dir().display(),
                    batch.len()
                );
            }
        }
    }

    /// Take one overflow file, if any, back through [`dispatch`](Self::dispatch).
    pub(crate) fn replay_one(self: &Arc<Self>, tasks: &WaitGroup) {
        match self.overflow.take_random() {
            Ok(Some(batch)) if !batch.is_empty() => {
                bump(&self.counters.batches_replayed);
                self.dispatch(batch, tasks);
            }
            Ok(_) => {}
            Err(err) => warn!(
                "failed to replay syslog overflow file from {}: {err}",
                self.overflow.dir().display()
            ),
        }
    }
}
