//! The batching thread.
//!
//! Collects framed messages from the buffer into batches closed by count or
//! by the linger window, hands each batch to [`Shared::dispatch`], and after
//! every under-full batch attempts one overflow replay.

use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Instant,
};

use crossbeam_channel::{Receiver, bounded};
use crossbeam_utils::sync::WaitGroup;
use log::debug;

use super::{message::Batch, shared::Shared};

/// Start the batching thread.
///
/// The returned receiver yields once the loop has observed the stop flag and
/// finished its last dispatch.
pub(crate) fn spawn_batcher(
    shared: Arc<Shared>,
    tasks: WaitGroup,
) -> io::Result<(JoinHandle<()>, Receiver<()>)> {
    let (done_tx, done_rx) = bounded(1);
    let handle = thread::Builder::new()
        .name("femtosyslog-batcher".into())
        .spawn(move || {
            batch_loop(&shared, &tasks);
            let _ = done_tx.send(());
        })?;
    Ok((handle, done_rx))
}

fn batch_loop(shared: &Arc<Shared>, tasks: &WaitGroup) {
    let batch_size = shared.config.batch_size;
    while shared.is_running() {
        let batch = collect_window(shared);
        let under_full = batch.messages() < batch_size;
        if !batch.is_empty() {
            debug!("dispatching batch of {} messages", batch.messages());
            shared.dispatch(batch.into_bytes(), tasks);
        }
        if under_full && shared.is_running() {
            shared.replay_one(tasks);
        }
    }
}

/// Gather messages until the batch is full or the linger window ends.
///
/// Each wait on the buffer is capped by the queue timeout, so a stop request
/// ends the window early instead of waiting out the linger.
pub(super) fn collect_window(shared: &Shared) -> Batch {
    let config = &shared.config;
    let deadline = Instant::now() + config.linger;
    let mut batch = Batch::default();
    while batch.messages() < config.batch_size && shared.is_running() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        if let Some(framed) = shared.buffer.get_timeout(remaining.min(config.queue_timeout)) {
            batch.push(&framed);
        }
    }
    batch
}

/// Dispatch whatever remains in the buffer, `batch_size` messages at a time.
///
/// Called once the batching thread has stopped and the buffer is closed.
pub(crate) fn drain_buffer(shared: &Arc<Shared>, tasks: &WaitGroup) {
    let batch_size = shared.config.batch_size;
    let mut batch = Batch::default();
    while let Some(framed) = shared.buffer.try_get() {
        batch.push(&framed);
        if batch.messages() >= batch_size {
            shared.dispatch(std::mem::take(&mut batch).into_bytes(), tasks);
        }
    }
    if !batch.is_empty() {
        shared.dispatch(batch.into_bytes(), tasks);
    }
}
