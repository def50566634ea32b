//! Fixed-capacity FIFO with timeout-bounded operations.
//!
//! [`BoundedQueue`] backs the transport's message buffer, its connection
//! pool, and (holding unit values) its send-permit semaphore. Operations
//! block on a crossbeam channel for at most the supplied timeout, so callers
//! never wait indefinitely and never spin.
//!
//! Closing the queue drops the only sender. Values already buffered remain
//! available to `get`, and `get` on an empty closed queue returns at once.

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::RwLock;

pub struct BoundedQueue<T> {
    tx: RwLock<Option<Sender<T>>>,
    rx: Receiver<T>,
    capacity: usize,
    timeout: Duration,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` values.
    ///
    /// `timeout` is the default wait applied by [`put`](Self::put) and
    /// [`get`](Self::get). A zero capacity is raised to one; a rendezvous
    /// channel cannot act as a buffer.
    pub fn new(capacity: usize, timeout: Duration) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = bounded(capacity);
        Self {
            tx: RwLock::new(Some(tx)),
            rx,
            capacity,
            timeout,
        }
    }

    /// Enqueue `value`, waiting up to the default timeout for space.
    ///
    /// The value is handed back when the queue stays full or is closed.
    pub fn put(&self, value: T) -> Result<(), T> {
        self.put_timeout(value, self.timeout)
    }

    /// Enqueue `value`, waiting up to `timeout` for space.
    pub fn put_timeout(&self, value: T, timeout: Duration) -> Result<(), T> {
        let guard = self.tx.read();
        let Some(tx) = guard.as_ref() else {
            return Err(value);
        };
        tx.send_timeout(value, timeout)
            .map_err(|err| err.into_inner())
    }

    /// Dequeue the oldest value, waiting up to the default timeout.
    pub fn get(&self) -> Option<T> {
        self.get_timeout(self.timeout)
    }

    /// Dequeue the oldest value, waiting up to `timeout`.
    pub fn get_timeout(&self, timeout: Duration) -> Option<T> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Dequeue the oldest value without waiting.
    pub fn try_get(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.rx.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Default timeout applied by [`put`](Self::put) and [`get`](Self::get).
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Stop accepting values. Idempotent.
    ///
    /// Waits for in-progress `put` calls, which are bounded by their timeout.
    pub fn close(&self) {
        self.tx.write().take();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.read().is_none()
    }
}

impl<T> std::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("timeout", &self.timeout)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::{
        sync::Arc,
        thread,
        time::{Duration, Instant},
    };

    const SHORT: Duration = Duration::from_millis(10);

    #[fixture]
    fn queue(#[default(3)] capacity: usize) -> BoundedQueue<u32> {
        BoundedQueue::new(capacity, SHORT)
    }

    #[rstest]
    fn put_fails_once_capacity_is_reached(queue: BoundedQueue<u32>) {
        for v in 0..3 {
            queue.put(v).expect("space available");
        }
        assert!(queue.is_full());
        assert_eq!(queue.put(99), Err(99));
        assert_eq!(queue.len(), 3);
    }

    #[rstest]
    fn get_drains_in_fifo_order(queue: BoundedQueue<u32>) {
        for v in [7, 8, 9] {
            queue.put(v).expect("space available");
        }
        assert_eq!(queue.get(), Some(7));
        assert_eq!(queue.get(), Some(8));
        assert_eq!(queue.get(), Some(9));
        assert!(queue.is_empty());
    }

    #[rstest]
    fn get_on_empty_queue_waits_for_timeout(queue: BoundedQueue<u32>) {
        let start = Instant::now();
        assert_eq!(queue.get_timeout(Duration::from_millis(30)), None);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[rstest]
    fn closed_queue_still_yields_buffered_values(queue: BoundedQueue<u32>) {
        queue.put(1).expect("space available");
        queue.close();
        assert!(queue.is_closed());
        assert_eq!(queue.get(), Some(1));
    }

    #[rstest]
    fn get_on_empty_closed_queue_returns_immediately(queue: BoundedQueue<u32>) {
        queue.close();
        let start = Instant::now();
        assert_eq!(queue.get_timeout(Duration::from_secs(5)), None);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[rstest]
    fn put_after_close_hands_value_back(queue: BoundedQueue<u32>) {
        queue.close();
        queue.close();
        assert_eq!(queue.put(4), Err(4));
    }

    #[rstest]
    fn zero_capacity_is_raised_to_one() {
        let queue: BoundedQueue<()> = BoundedQueue::new(0, SHORT);
        assert_eq!(queue.capacity(), 1);
        queue.put(()).expect("one slot available");
        assert!(queue.is_full());
    }

    #[rstest]
    fn blocked_put_completes_when_consumer_frees_space() {
        let queue = Arc::new(BoundedQueue::new(1, SHORT));
        queue.put(1u32).expect("space available");
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                queue.get()
            })
        };
        queue
            .put_timeout(2, Duration::from_secs(2))
            .expect("consumer frees a slot");
        assert_eq!(consumer.join().expect("consumer thread"), Some(1));
        assert_eq!(queue.get(), Some(2));
    }
}
