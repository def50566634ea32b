//! Wire framing and batch accumulation.

use crate::priority::Priority;

/// Frame one message as `<PRI>message\n`.
///
/// A message that already ends in a newline is not given a second one.
pub(crate) fn frame_message(priority: Priority, message: &[u8]) -> Vec<u8> {
    let prefix = priority.to_string();
    let mut framed = Vec::with_capacity(prefix.len() + message.len() + 1);
    framed.extend_from_slice(prefix.as_bytes());
    framed.extend_from_slice(message);
    if !message.ends_with(b"\n") {
        framed.push(b'\n');
    }
    framed
}

/// Length of `message` once newline-terminated, excluding the prefix.
pub(crate) fn terminated_len(message: &[u8]) -> usize {
    message.len() + usize::from(!message.ends_with(b"\n"))
}

/// Framed messages concatenated in arrival order.
#[derive(Debug, Default)]
pub(crate) struct Batch {
    bytes: Vec<u8>,
    messages: usize,
}

impl Batch {
    pub(crate) fn push(&mut self, framed: &[u8]) {
        self.bytes.extend_from_slice(framed);
        self.messages += 1;
    }

    pub(crate) fn messages(&self) -> usize {
        self.messages
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.messages == 0
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
