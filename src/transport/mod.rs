//! Batching syslog transport.
//!
//! [`SyslogTransport`] accepts framed messages into a bounded buffer. A
//! batching thread closes a batch once it holds `batch_size` messages or the
//! linger window ends, then hands it to a send thread. At most
//! `max_in_flight` send threads run at once; each writes its batch over a
//! pooled connection. Batches that find no permit, no connection, or a
//! failing socket are stored in the overflow directory, and every under-full
//! batch is followed by an attempt to replay one stored batch.

mod handle;
mod message;
mod permits;
mod shared;
mod stats;
mod worker;


pub use handle::{SUPPORTED_NETWORK, SyslogTransport};
pub use stats::TransportStats;
