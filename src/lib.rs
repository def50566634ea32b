//! Resilient syslog shipping over TCP.
//!
//! [`SyslogTransport`] batches framed syslog messages, writes them over a
//! small pool of long-lived connections, and stores any batch it cannot
//! deliver in an overflow directory for later replay.

pub mod clock;
pub mod config;
pub mod error;
pub mod handler;
pub mod overflow;
pub mod pool;
pub mod priority;
pub mod queue;
pub mod rate_limited_warner;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

/// `logtest::Logger::start` installs a process-global logger and panics if
/// called twice, so unit tests share a single installation.
#[cfg(test)]
pub(crate) fn start_test_logger() -> logtest::Logger {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = logtest::Logger::start();
    });
    logtest::Logger
}

pub use config::TransportConfig;
pub use error::TransportError;
pub use handler::LogHandle;
pub use overflow::OverflowStore;
pub use pool::{ConnectionPool, PoolSettings, PoolSlot, PooledConnection};
pub use priority::{Facility, Priority, Severity};
pub use queue::BoundedQueue;
pub use transport::{SyslogTransport, TransportStats};
