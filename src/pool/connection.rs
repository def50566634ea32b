//! Pooled TCP connection and the dialler that creates it.

use std::{
    io::{self, Write},
    net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs},
    time::{Duration, Instant},
};

/// An open connection tagged with its age and lifetime.
///
/// Whoever holds a `PooledConnection` owns it exclusively until it is either
/// released back to the pool or closed.
#[derive(Debug)]
pub struct PooledConnection {
    stream: TcpStream,
    created_at: u64,
    lifetime: u64,
    write_timeout: Duration,
}

impl PooledConnection {
    pub(crate) fn new(
        stream: TcpStream,
        created_at: u64,
        lifetime: u64,
        write_timeout: Duration,
    ) -> Self {
        Self {
            stream,
            created_at,
            lifetime,
            write_timeout,
        }
    }

    /// Creation time in seconds since the UNIX epoch.
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// True once the connection has outlived its lifetime at `now`.
    pub fn is_expired(&self, now: u64) -> bool {
        now.saturating_sub(self.created_at) > self.lifetime
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream.local_addr()
    }

    /// Write a whole batch before the per-send deadline.
    ///
    /// The write timeout bounds the batch as a whole: each write waits only
    /// for the time left, and the send fails with `TimedOut` once the
    /// deadline passes, however steadily the peer is reading.
    pub fn send(&mut self, batch: &[u8]) -> io::Result<()> {
        let deadline = Instant::now() + self.write_timeout;
        let mut rest = batch;
        while !rest.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(deadline_exceeded(batch.len() - rest.len(), batch.len()));
            }
            self.stream.set_write_timeout(Some(remaining))?;
            match self.stream.write(rest) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "syslog collector stopped accepting data",
                    ));
                }
                Ok(n) => rest = &rest[n..],
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    return Err(deadline_exceeded(batch.len() - rest.len(), batch.len()));
                }
                Err(err) => return Err(err),
            }
        }
        self.stream.flush()
    }

    /// Shut the socket down in both directions and drop it.
    pub fn close(self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

fn deadline_exceeded(written: usize, total: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::TimedOut,
        format!("send deadline passed after {written} of {total} bytes"),
    )
}

/// Dial `addr` ("host:port"), trying each resolved address in turn.
pub(crate) fn connect_tcp(addr: &str, timeout: Duration) -> io::Result<TcpStream> {
    connect_any(addr.to_socket_addrs()?, addr, timeout)
}

/// Return the first candidate that both connects and accepts socket
/// options; a failure at either step moves on to the next candidate.
pub(crate) fn connect_any(
    candidates: impl IntoIterator<Item = SocketAddr>,
    addr: &str,
    timeout: Duration,
) -> io::Result<TcpStream> {
    let mut last_err = None;
    for candidate in candidates {
        let opened = TcpStream::connect_timeout(&candidate, timeout)
            .and_then(|stream| stream.set_nodelay(true).map(|()| stream));
        match opened {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("{addr} did not resolve to any address"),
        )
    }))
}
