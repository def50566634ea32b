//! The public transport handle.

use std::{io, path::Path, sync::Arc, thread::JoinHandle};

use crossbeam_channel::Receiver;
use crossbeam_utils::sync::WaitGroup;
use log::warn;
use parking_lot::Mutex;

use crate::{
    clock::system_clock,
    config::TransportConfig,
    error::TransportError,
    handler::LogHandle,
    overflow::OverflowStore,
    priority::{Priority, Severity},
};

use super::{
    message::{frame_message, terminated_len},
    shared::Shared,
    stats::TransportStats,
    worker::{drain_buffer, spawn_batcher},
};

/// The only network the transport speaks.
pub const SUPPORTED_NETWORK: &str = "tcp";

struct Lifecycle {
    batcher: JoinHandle<()>,
    stopped: Receiver<()>,
    tasks: WaitGroup,
}

/// Batching syslog client over TCP with disk overflow.
///
/// Writes are framed as `<PRI>message\n` and queued for a background batching
/// thread. Batches are written over pooled connections by short-lived send
/// threads; any batch that cannot be delivered is stored in the overflow
/// directory and replayed later. [`close`](Self::close) flushes everything
/// still buffered either to the collector or to disk.
pub struct SyslogTransport {
    shared: Arc<Shared>,
    lifecycle: Mutex<Option<Lifecycle>>,
}

impl SyslogTransport {
    /// Connect to `addr` with configuration read from the environment.
    ///
    /// `severity` is a syslog severity in `0..=7`; the facility comes from
    /// the configuration.
    pub fn dial(network: &str, addr: &str, severity: i32) -> Result<Self, TransportError> {
        Self::dial_with_config(network, addr, severity, TransportConfig::from_env())
    }

    /// Connect to `addr` with an explicit configuration.
    pub fn dial_with_config(
        network: &str,
        addr: &str,
        severity: i32,
        config: TransportConfig,
    ) -> Result<Self, TransportError> {
        if network != SUPPORTED_NETWORK {
            return Err(TransportError::UnsupportedNetwork(network.to_owned()));
        }
        let severity = Severity::try_from(severity)?;
        config.validate()?;
        let overflow = OverflowStore::open(&config.overflow_dir).map_err(|source| {
            TransportError::OverflowDir {
                path: config.overflow_dir.clone(),
                source,
            }
        })?;
        let priority = Priority::new(config.facility, severity);
        let shared = Shared::new(addr, priority, config, overflow, system_clock());
        shared.pool.replenish();

        let tasks = WaitGroup::new();
        let (batcher, stopped) = match spawn_batcher(Arc::clone(&shared), tasks.clone()) {
            Ok(started) => started,
            Err(err) => {
                shared.pool.shutdown();
                return Err(TransportError::Spawn(err));
            }
        };
        Ok(Self {
            shared,
            lifecycle: Mutex::new(Some(Lifecycle {
                batcher,
                stopped,
                tasks,
            })),
        })
    }

    /// Queue one message, returning its newline-terminated length.
    ///
    /// A message that cannot be queued within the enqueue timeout is dropped
    /// and counted in [`stats`](Self::stats); that is not an error. Writing
    /// to a closed transport fails with [`TransportError::Closed`].
    pub fn write_bytes(&self, message: &[u8]) -> Result<usize, TransportError> {
        self.shared.enqueue(frame_message(self.shared.priority, message))?;
        Ok(terminated_len(message))
    }

    pub fn write_string(&self, message: &str) -> Result<usize, TransportError> {
        self.write_bytes(message.as_bytes())
    }

    /// Queue one message.
    pub fn send(&self, message: impl AsRef<[u8]>) -> Result<(), TransportError> {
        self.write_bytes(message.as_ref()).map(drop)
    }

    /// Stop batching and flush everything still buffered.
    ///
    /// Blocks until every dispatched batch has been written to the collector
    /// or to the overflow directory, then closes all pooled connections.
    /// Later calls return immediately.
    pub fn close(&self) {
        let mut guard = self.lifecycle.lock();
        let Some(Lifecycle {
            batcher,
            stopped,
            tasks,
        }) = guard.take()
        else {
            return;
        };
        let shared = &self.shared;
        shared.stop();
        if stopped.recv().is_err() {
            warn!("syslog batching thread for {} exited early", shared.addr);
        }
        if batcher.join().is_err() {
            warn!("syslog batching thread for {} panicked", shared.addr);
        }
        shared.buffer.close();
        drain_buffer(shared, &tasks);
        tasks.wait();
        shared.pool.shutdown();
        shared.drop_warner.flush();
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle.lock().is_none()
    }

    pub fn stats(&self) -> TransportStats {
        self.shared.counters.snapshot(&self.shared.permits)
    }

    pub fn addr(&self) -> &str {
        &self.shared.addr
    }

    pub fn priority(&self) -> Priority {
        self.shared.priority
    }

    pub fn config(&self) -> &TransportConfig {
        &self.shared.config
    }

    pub fn overflow(&self) -> &OverflowStore {
        &self.shared.overflow
    }

    pub fn overflow_dir(&self) -> &Path {
        self.shared.overflow.dir()
    }
}

impl Drop for SyslogTransport {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SyslogTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyslogTransport")
            .field("addr", &self.shared.addr)
            .field("priority", &self.shared.priority)
            .field("buffered", &self.shared.buffer.len())
            .field("stats", &self.stats())
            .finish()
    }
}

impl LogHandle for SyslogTransport {
    fn write_bytes(&self, message: &[u8]) -> Result<usize, TransportError> {
        SyslogTransport::write_bytes(self, message)
    }

    fn close(&self) -> Result<(), TransportError> {
        SyslogTransport::close(self);
        Ok(())
    }
}

impl io::Write for &SyslogTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for SyslogTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
