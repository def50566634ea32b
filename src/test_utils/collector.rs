//! In-process TCP syslog collector.
//!
//! Every accepted connection is read to EOF into its own buffer, so lines
//! from one connection are never interleaved with another's.

use std::{
    io::Read,
    net::{SocketAddr, TcpListener, TcpStream},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

type ConnectionLog = Arc<Mutex<Vec<u8>>>;

/// Listener on an ephemeral loopback port recording everything it receives.
pub struct Collector {
    addr: SocketAddr,
    connections: Arc<Mutex<Vec<ConnectionLog>>>,
    stopping: Arc<AtomicBool>,
}

impl Collector {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind collector");
        let addr = listener.local_addr().expect("collector address");
        let connections: Arc<Mutex<Vec<ConnectionLog>>> = Arc::default();
        let stopping = Arc::new(AtomicBool::new(false));
        {
            let connections = Arc::clone(&connections);
            let stopping = Arc::clone(&stopping);
            thread::spawn(move || {
                for stream in listener.incoming() {
                    if stopping.load(Ordering::SeqCst) {
                        break;
                    }
                    let Ok(stream) = stream else { continue };
                    let log = ConnectionLog::default();
                    connections.lock().push(Arc::clone(&log));
                    thread::spawn(move || read_to_end(stream, &log));
                }
            });
        }
        Self {
            addr,
            connections,
            stopping,
        }
    }

    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    /// Number of connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.lock().len()
    }

    /// Raw bytes received on each connection.
    pub fn received(&self) -> Vec<Vec<u8>> {
        self.connections
            .lock()
            .iter()
            .map(|log| log.lock().clone())
            .collect()
    }

    /// Complete newline-terminated lines received across all connections.
    pub fn lines(&self) -> Vec<String> {
        self.received()
            .iter()
            .flat_map(|bytes| complete_lines(bytes))
            .collect()
    }

    /// Poll until at least `count` lines have arrived or `timeout` elapses.
    pub fn wait_for_lines(&self, count: usize, timeout: Duration) -> Vec<String> {
        let deadline = Instant::now() + timeout;
        loop {
            let lines = self.lines();
            if lines.len() >= count || Instant::now() >= deadline {
                return lines;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        // Wake the accept loop so it observes the flag.
        let _ = TcpStream::connect_timeout(&self.addr, Duration::from_millis(100));
    }
}

fn read_to_end(mut stream: TcpStream, log: &Mutex<Vec<u8>>) {
    let mut chunk = [0_u8; 4096];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(n) => log.lock().extend_from_slice(&chunk[..n]),
        }
    }
}

fn complete_lines(bytes: &[u8]) -> Vec<String> {
    let Some(end) = bytes.iter().rposition(|&b| b == b'\n') else {
        return Vec::new();
    };
    String::from_utf8_lossy(&bytes[..end])
        .split('\n')
        .map(str::to_owned)
        .collect()
}

/// Address of a loopback port with no listener.
pub fn dead_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe listener");
    let addr = listener.local_addr().expect("probe address");
    drop(listener);
    addr.to_string()
}
