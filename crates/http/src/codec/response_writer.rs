//! Response framing on top of the non-blocking send contract.
//!
//! [`HttpResponse`] is the whole capability a handler gets for replying: hand a
//! complete frame to the connection, and learn who the peer is. Everything else in
//! [`HttpResponseExt`] builds one contiguous buffer and passes it to
//! [`HttpResponse::send`] in a single call, so a response can never interleave with
//! another write on the same connection.

use std::io;
use std::net::SocketAddr;
use std::path::Path;

use bytes::{Bytes, BytesMut};
use http::StatusCode;
use mime::Mime;
use tokio_util::codec::Encoder;
use tracing::error;

use crate::codec::header::{HeaderEncoder, ResponseHead};
use crate::protocol::{Charset, KeyValueList, SendResult};

pub trait HttpResponse {
    /// Queues a fully framed message for the peer.
    ///
    /// Writes as much as the socket accepts right now; the rest is queued in order and
    /// flushed on later write-readiness events.
    fn send(&mut self, full_response: Bytes) -> SendResult;

    fn remote_addr(&self) -> SocketAddr;
}

impl<T: HttpResponse + ?Sized> HttpResponse for &mut T {
    fn send(&mut self, full_response: Bytes) -> SendResult {
        (**self).send(full_response)
    }

    fn remote_addr(&self) -> SocketAddr {
        (**self).remote_addr()
    }
}

impl<T: HttpResponse + ?Sized> HttpResponse for Box<T> {
    fn send(&mut self, full_response: Bytes) -> SendResult {
        (**self).send(full_response)
    }

    fn remote_addr(&self) -> SocketAddr {
        (**self).remote_addr()
    }
}

pub trait HttpResponseExt: HttpResponse {
    /// Sends a complete response with a computed `Content-Length`.
    fn send_response(
        &mut self,
        status: StatusCode,
        content_type: &Mime,
        headers: Option<&KeyValueList>,
        content: &[u8],
        charset: Option<Charset>,
    ) -> SendResult {
        let head = ResponseHead { status, content_type: Some(content_type), charset, headers, content_length: Some(content.len()) };
        let mut buffer = BytesMut::with_capacity(256 + content.len());
        if let Err(e) = HeaderEncoder.encode(head, &mut buffer) {
            error!(cause = %e, "can't encode response head");
            return SendResult::Closed;
        }
        buffer.extend_from_slice(content);
        self.send(buffer.freeze())
    }

    /// Sends `content` encoded with `charset`, announcing the charset in `Content-Type`.
    fn send_text(&mut self, status: StatusCode, content_type: &Mime, content: &str, charset: Charset) -> SendResult {
        let encoded = charset.encode(content);
        self.send_response(status, content_type, None, &encoded, Some(charset))
    }

    /// Sends the contents of the file at `path` as the body.
    ///
    /// The file is read before anything is sent; a read failure leaves the connection
    /// untouched so the caller can still answer with an error status.
    fn send_file(
        &mut self,
        status: StatusCode,
        content_type: &Mime,
        path: impl AsRef<Path>,
        charset: Option<Charset>,
    ) -> io::Result<SendResult> {
        let content = std::fs::read(path)?;
        Ok(self.send_response(status, content_type, None, &content, charset))
    }

    /// Sends a bodiless response, typically an error status right before closing.
    fn send_status(&mut self, status: StatusCode) -> SendResult {
        let head = ResponseHead { content_length: Some(0), ..ResponseHead::new(status) };
        let mut buffer = BytesMut::new();
        if let Err(e) = HeaderEncoder.encode(head, &mut buffer) {
            error!(cause = %e, "can't encode response head");
            return SendResult::Closed;
        }
        self.send(buffer.freeze())
    }

    /// Sends the `101 Switching Protocols` reply completing a WebSocket handshake.
    fn send_websocket_handshake(&mut self, accept: &str, additional_headers: Option<&KeyValueList>) -> SendResult {
        let mut buffer = BytesMut::with_capacity(160);
        buffer.extend_from_slice(b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: ");
        buffer.extend_from_slice(accept.as_bytes());
        buffer.extend_from_slice(b"\r\n");
        if let Some(headers) = additional_headers {
            headers.append_to(&mut buffer);
        }
        buffer.extend_from_slice(b"\r\n");
        self.send(buffer.freeze())
    }
}

impl<T: HttpResponse + ?Sized> HttpResponseExt for T {}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Records every frame, always reports a full write.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingResponse {
        pub(crate) frames: Vec<Bytes>,
    }

    impl HttpResponse for RecordingResponse {
        fn send(&mut self, full_response: Bytes) -> SendResult {
            self.frames.push(full_response);
            SendResult::Full
        }

        fn remote_addr(&self) -> SocketAddr {
            "127.0.0.1:40000".parse().unwrap()
        }
    }

    #[test]
    fn response_is_one_frame() {
        let mut response = RecordingResponse::default();
        let result = response.send_text(StatusCode::OK, &mime::TEXT_PLAIN, "hello", Charset::Utf8);

        assert_eq!(result, SendResult::Full);
        assert_eq!(response.frames.len(), 1);
        assert_eq!(
            &response.frames[0][..],
            &b"HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=UTF-8\r\nContent-Length: 5\r\n\r\nhello"[..]
        );
    }

    #[test]
    fn file_is_sent_as_body() {
        let path = std::env::temp_dir().join(format!("nio-http-send-file-{}.html", std::process::id()));
        std::fs::write(&path, "<p>hi</p>").unwrap();

        let mut response = RecordingResponse::default();
        let result = response.send_file(StatusCode::OK, &mime::TEXT_HTML, &path, Some(Charset::Utf8)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(result, SendResult::Full);
        assert_eq!(
            &response.frames[0][..],
            &b"HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=UTF-8\r\nContent-Length: 9\r\n\r\n<p>hi</p>"[..]
        );
    }

    #[test]
    fn missing_file_sends_nothing() {
        let mut response = RecordingResponse::default();
        let err = response.send_file(StatusCode::OK, &mime::TEXT_HTML, "/definitely/not/here.html", None).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(response.frames.is_empty());
    }

    #[test]
    fn handshake_reply() {
        let mut response = RecordingResponse::default();
        let mut headers = KeyValueList::new();
        headers.add("Sec-WebSocket-Protocol", "chat").unwrap();
        response.send_websocket_handshake("s3pPLMBiTxaQ9kYGzzhZRbK+xOo=", Some(&headers));

        assert_eq!(
            &response.frames[0][..],
            &b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\nsec-websocket-protocol: chat\r\n\r\n"[..]
        );
    }

    #[test]
    fn encodes_with_charset() {
        let mut response = RecordingResponse::default();
        response.send_text(StatusCode::NOT_FOUND, &mime::TEXT_PLAIN, "/caf\u{e9} Not Found", Charset::UsAscii);
        let frame = &response.frames[0];
        assert!(frame.ends_with(b"\r\n\r\n/caf? Not Found"));
        assert!(frame.starts_with(b"HTTP/1.1 404 Not Found\r\n"));
    }
}
