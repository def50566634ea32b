//! Bounded pool of outbound syslog connections.
//!
//! The pool stores [`PoolSlot`] values in a [`BoundedQueue`]. A slot is
//! either a live connection or a vacant marker left behind by a failed dial,
//! which keeps the pool's bookkeeping uniform whether or not the collector is
//! reachable. Connections are created lazily by [`ConnectionPool::acquire`]
//! and discarded once older than the configured lifetime.

mod connection;


use std::time::Duration;

use log::{debug, warn};

use crate::{clock::TimeProvider, config::TransportConfig, queue::BoundedQueue};

pub use connection::PooledConnection;
use connection::connect_tcp;

/// Entry held by the pool.
#[derive(Debug)]
pub enum PoolSlot {
    Live(PooledConnection),
    Vacant,
}

/// Tunables applied to every connection the pool creates.
#[derive(Clone, Debug)]
pub struct PoolSettings {
    pub capacity: usize,
    pub queue_timeout: Duration,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
    pub lifetime: Duration,
}

impl From<&TransportConfig> for PoolSettings {
    fn from(cfg: &TransportConfig) -> Self {
        Self {
            capacity: cfg.pool_capacity,
            queue_timeout: cfg.queue_timeout,
            connect_timeout: cfg.send_timeout,
            write_timeout: cfg.send_timeout,
            lifetime: cfg.conn_lifetime,
        }
    }
}

pub struct ConnectionPool {
    addr: String,
    slots: BoundedQueue<PoolSlot>,
    settings: PoolSettings,
    clock: TimeProvider,
}

impl ConnectionPool {
    pub fn new(addr: impl Into<String>, settings: PoolSettings, clock: TimeProvider) -> Self {
        Self {
            addr: addr.into(),
            slots: BoundedQueue::new(settings.capacity, settings.queue_timeout),
            settings,
            clock,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Number of slots currently held, vacant markers included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Check out a live connection.
    ///
    /// An empty pool is refilled with exactly one dial attempt. At most as
    /// many slots as the pool held are inspected; expired connections are
    /// closed and vacant markers consumed along the way.
    pub fn acquire(&self) -> Option<PooledConnection> {
        let mut pending = self.slots.len();
        if pending == 0 {
            self.replenish();
            pending = 1;
        }
        for _ in 0..pending {
            match self.slots.get() {
                Some(PoolSlot::Live(conn)) => {
                    let now = (self.clock)();
                    if conn.is_expired(now) {
                        debug!(
                            "closing syslog connection to {} created at {}",
                            self.addr,
                            conn.created_at()
                        );
                        conn.close();
                        continue;
                    }
                    return Some(conn);
                }
                Some(PoolSlot::Vacant) | None => continue,
            }
        }
        None
    }

    /// Dial one new connection into the pool.
    ///
    /// A failed dial is logged and recorded as a vacant slot.
    pub fn replenish(&self) {
        let slot = match connect_tcp(&self.addr, self.settings.connect_timeout) {
            Ok(stream) => PoolSlot::Live(PooledConnection::new(
                stream,
                (self.clock)(),
                self.settings.lifetime.as_secs(),
                self.settings.write_timeout,
            )),
            Err(err) => {
                warn!("syslog connect to {} failed: {err}", self.addr);
                PoolSlot::Vacant
            }
        };
        if let Err(PoolSlot::Live(conn)) = self.slots.put(slot) {
            conn.close();
        }
    }

    /// Return a healthy connection; it is closed if the pool is full.
    pub fn release(&self, conn: PooledConnection) {
        if let Err(PoolSlot::Live(conn)) = self.slots.put(PoolSlot::Live(conn)) {
            debug!("syslog pool for {} full; closing connection", self.addr);
            conn.close();
        }
    }

    /// Close every pooled connection and stop accepting new ones.
    pub fn shutdown(&self) {
        self.slots.close();
        while let Some(slot) = self.slots.try_get() {
            if let PoolSlot::Live(conn) = slot {
                conn.close();
            }
        }
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("addr", &self.addr)
            .field("slots", &self.slots)
            .field("settings", &self.settings)
            .finish()
    }
}
