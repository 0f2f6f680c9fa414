/// Outcome of one write attempt on a connection.
///
/// `Buffered` carries the total number of bytes still queued for the connection
/// *after* this call, not just the part of this write that could not be sent.
/// Handlers use it for flow control, e.g. a WebSocket producer may stop sending
/// once the backlog grows past a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendResult {
    /// Every byte was handed to the socket immediately.
    Full,
    /// Some bytes were queued, the value is the connection's outstanding byte count.
    Buffered(usize),
    /// The connection already failed or closed, nothing was written.
    Closed,
}

impl SendResult {
    #[inline]
    pub fn is_full(&self) -> bool {
        matches!(self, SendResult::Full)
    }

    #[inline]
    pub fn is_buffered(&self) -> bool {
        matches!(self, SendResult::Buffered(_))
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, SendResult::Closed)
    }

    /// Bytes waiting in the outbound queue, zero unless `Buffered`.
    #[inline]
    pub fn buffered_bytes(&self) -> usize {
        match self {
            SendResult::Buffered(n) => *n,
            SendResult::Full | SendResult::Closed => 0,
        }
    }
}
