use crate::error::TransportError;

/// Write interface a logging facade drives.
///
/// `LogHandle` is `Send + Sync` so one handle can be shared by every thread
/// that logs. Writes queue the message and return without waiting for
/// delivery.
pub trait LogHandle: Send + Sync {
    /// Queue one message, returning the number of bytes accepted.
    fn write_bytes(&self, message: &[u8]) -> Result<usize, TransportError>;

    fn write_string(&self, message: &str) -> Result<usize, TransportError> {
        self.write_bytes(message.as_bytes())
    }

    /// Flush pending messages and release resources.
    fn close(&self) -> Result<(), TransportError>;
}
