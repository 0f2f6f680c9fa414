use std::fmt;
use std::net::SocketAddr;

use bytes::BytesMut;
use tracing::debug;

use crate::codec::HttpResponse;
use crate::protocol::{Charset, SendResult};
use crate::websocket::frame::MAX_CONTROL_PAYLOAD;
use crate::websocket::{Frame, Opcode};

/// What a WebSocket callback may do with its connection.
///
/// Every method frames a single message and hands it to the underlying connection in one
/// write, so the backpressure contract of [`SendResult`] applies unchanged. Once a close
/// frame was sent no further data frames are accepted.
pub struct WebSocketConnection<'a> {
    out: &'a mut dyn HttpResponse,
    charset: Charset,
    closing: &'a mut bool,
}

impl<'a> WebSocketConnection<'a> {
    pub(crate) fn new(out: &'a mut dyn HttpResponse, charset: Charset, closing: &'a mut bool) -> Self {
        Self { out, charset, closing }
    }

    /// Sends a text message encoded with the server's WebSocket charset.
    pub fn send(&mut self, text: &str) -> SendResult {
        let payload = self.charset.encode(text).into_owned();
        self.send_frame(Frame::text(payload))
    }

    pub fn send_binary(&mut self, data: &[u8]) -> SendResult {
        self.send_frame(Frame::binary(data.to_vec()))
    }

    /// Sends a ping; payloads longer than a control frame allows are truncated.
    pub fn send_ping(&mut self, data: &[u8]) -> SendResult {
        let len = data.len().min(MAX_CONTROL_PAYLOAD);
        self.send_frame(Frame::ping(data[..len].to_vec()))
    }

    /// Starts the closing handshake; the connection is torn down once the frame is flushed.
    pub fn close(&mut self, code: u16, reason: &str) -> SendResult {
        if *self.closing {
            return SendResult::Closed;
        }
        let mut reason = reason;
        while reason.len() > MAX_CONTROL_PAYLOAD - 2 {
            let mut end = reason.len() - 1;
            while !reason.is_char_boundary(end) {
                end -= 1;
            }
            reason = &reason[..end];
        }
        let result = self.send_frame(Frame::close(Some(code), reason));
        *self.closing = true;
        result
    }

    pub fn is_closing(&self) -> bool {
        *self.closing
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.out.remote_addr()
    }

    pub(crate) fn send_frame(&mut self, frame: Frame) -> SendResult {
        if *self.closing && frame.opcode != Opcode::Close {
            debug!(opcode = ?frame.opcode, "dropping frame after close");
            return SendResult::Closed;
        }
        let mut buffer = BytesMut::with_capacity(frame.payload.len() + 14);
        frame.write_to(None, &mut buffer);
        self.out.send(buffer.freeze())
    }
}

impl fmt::Debug for WebSocketConnection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketConnection")
            .field("remote_addr", &self.out.remote_addr())
            .field("charset", &self.charset)
            .field("closing", &*self.closing)
            .finish()
    }
}
