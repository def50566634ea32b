//! Error type surfaced by the transport's construction and write APIs.
//!
//! Delivery failures never appear here: they are absorbed by the transport
//! and resolved by spilling to the overflow directory.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors returned to callers of [`SyslogTransport`](crate::SyslogTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The severity lies outside the syslog range `0..=7`.
    #[error("invalid syslog priority: {0}")]
    InvalidPriority(i32),
    /// Only the `tcp` network is supported.
    #[error("unsupported network {0:?}: syslog transport only supports tcp")]
    UnsupportedNetwork(String),
    /// Invalid user supplied configuration.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),
    /// The overflow directory could not be created.
    #[error("failed to prepare overflow directory {}: {source}", path.display())]
    OverflowDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The batching thread could not be started.
    #[error("failed to start batching thread: {0}")]
    Spawn(#[source] io::Error),
    /// The transport has been closed.
    #[error("syslog transport is closed")]
    Closed,
}

impl From<TransportError> for io::Error {
    fn from(err: TransportError) -> Self {
        let kind = match &err {
            TransportError::Closed => io::ErrorKind::BrokenPipe,
            TransportError::UnsupportedNetwork(_) => io::ErrorKind::Unsupported,
            TransportError::InvalidPriority(_) | TransportError::InvalidConfig(_) => {
                io::ErrorKind::InvalidInput
            }
            TransportError::OverflowDir { source, .. } | TransportError::Spawn(source) => {
                source.kind()
            }
        };
        io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TransportError::Closed, io::ErrorKind::BrokenPipe)]
    #[case(TransportError::InvalidPriority(9), io::ErrorKind::InvalidInput)]
    #[case(TransportError::UnsupportedNetwork("udp".into()), io::ErrorKind::Unsupported)]
    #[case(
        TransportError::OverflowDir {
            path: PathBuf::from("/nope"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        },
        io::ErrorKind::PermissionDenied
    )]
    fn converts_into_io_error(#[case] err: TransportError, #[case] kind: io::ErrorKind) {
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), kind);
    }

    #[rstest]
    fn overflow_dir_message_names_path() {
        let err = TransportError::OverflowDir {
            path: PathBuf::from("/data/syslog_buffer"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().contains("/data/syslog_buffer"));
    }
}
