use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::rc::Rc;

use bytes::{Buf, Bytes};
use tracing::{debug, warn};

use crate::codec::HttpResponse;
use crate::connection::Socket;
use crate::protocol::{SendError, SendResult};

/// Outbound side of a connection.
///
/// A send writes as much as the socket takes immediately and queues the remainder.
/// Once anything is queued, later sends are appended behind it untouched so frames
/// reach the peer in the order they were sent. The queue drains on write readiness
/// through [`flush`](MessageWriter::flush).
#[derive(Debug)]
pub struct MessageWriter<W> {
    socket: Rc<W>,
    queue: VecDeque<Bytes>,
    buffered: usize,
    remote_addr: SocketAddr,
    failure: Option<io::Error>,
    closed: bool,
}

impl<W: Socket> MessageWriter<W> {
    pub fn new(socket: Rc<W>, remote_addr: SocketAddr) -> Self {
        Self { socket, queue: VecDeque::new(), buffered: 0, remote_addr, failure: None, closed: false }
    }

    /// Bytes accepted by [`send`](HttpResponse::send) but not yet written to the socket.
    #[inline]
    pub fn buffered_bytes(&self) -> usize {
        self.buffered
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        self.buffered > 0
    }

    /// The write error that made the writer give up, if any.
    pub fn take_failure(&mut self) -> Option<io::Error> {
        self.failure.take()
    }

    pub fn has_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Writes queued bytes until the socket blocks; returns the bytes still queued.
    pub fn flush(&mut self) -> Result<usize, SendError> {
        if self.closed {
            return Err(SendError::Closed);
        }

        while let Some(front) = self.queue.front_mut() {
            match self.socket.try_write(front) {
                Ok(0) => return Err(SendError::io(self.fail(io::ErrorKind::WriteZero.into()))),
                Ok(n) => {
                    self.buffered -= n;
                    if n == front.len() {
                        self.queue.pop_front();
                    } else {
                        front.advance(n);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(SendError::io(self.fail(e))),
            }
        }
        Ok(self.buffered)
    }

    /// Drops anything still queued; later sends report [`SendResult::Closed`].
    pub fn close(&mut self) {
        if !self.closed && self.buffered > 0 {
            debug!(remote_addr = %self.remote_addr, dropped = self.buffered, "discarding unsent bytes");
        }
        self.closed = true;
        self.queue.clear();
        self.buffered = 0;
    }

    fn fail(&mut self, e: io::Error) -> io::Error {
        warn!(remote_addr = %self.remote_addr, cause = %e, "write failed");
        let kind = e.kind();
        self.failure = Some(e);
        self.close();
        kind.into()
    }

    fn enqueue(&mut self, bytes: Bytes) -> SendResult {
        self.buffered += bytes.len();
        self.queue.push_back(bytes);
        SendResult::Buffered(self.buffered)
    }
}

impl<W: Socket> HttpResponse for MessageWriter<W> {
    fn send(&mut self, mut full_response: Bytes) -> SendResult {
        if self.closed {
            return SendResult::Closed;
        }
        if full_response.is_empty() {
            return if self.has_pending() { SendResult::Buffered(self.buffered) } else { SendResult::Full };
        }
        if self.has_pending() {
            return self.enqueue(full_response);
        }

        loop {
            match self.socket.try_write(&full_response) {
                Ok(0) => {
                    self.fail(io::ErrorKind::WriteZero.into());
                    return SendResult::Closed;
                }
                Ok(n) if n == full_response.len() => return SendResult::Full,
                Ok(n) => full_response.advance(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return self.enqueue(full_response),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.fail(e);
                    return SendResult::Closed;
                }
            }
        }
    }

    fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }
}
