use std::fmt;

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::{debug, trace, warn};

use crate::codec::HttpResponse;
use crate::handler::Upgrade;
use crate::protocol::{Charset, HandlerError};
use crate::websocket::{
    Frame, FrameCodec, Message, MessageAssembler, Opcode, WebSocketConnection, WebSocketSession, WsError, close_code,
};

/// Whether the connection keeps reading after the bytes just consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// The read side of an upgraded connection.
///
/// Consumes buffered input frame by frame, answers control frames, reassembles data
/// messages and hands them to the session. Writes go through the connection's
/// [`HttpResponse`], so they share its queue with anything sent before the upgrade.
pub struct WebSocketStream {
    codec: FrameCodec,
    assembler: MessageAssembler,
    session: Box<dyn WebSocketSession>,
    charset: Charset,
    closing: bool,
    closed: bool,
}

impl WebSocketStream {
    pub fn new(upgrade: Upgrade, charset: Charset, max_frame_size: usize) -> Self {
        Self {
            codec: FrameCodec::server().max_payload_size(max_frame_size),
            assembler: MessageAssembler::new(max_frame_size),
            session: upgrade.session,
            charset,
            closing: upgrade.closing,
            closed: false,
        }
    }

    pub fn on_bytes(&mut self, src: &mut BytesMut, out: &mut dyn HttpResponse) -> Flow {
        loop {
            if self.closing {
                return Flow::Close;
            }

            let frame = match self.codec.decode(src) {
                Ok(Some(frame)) => frame,
                Ok(None) => return Flow::Continue,
                Err(e) => {
                    self.fail(out, &e);
                    return Flow::Close;
                }
            };
            trace!(opcode = ?frame.opcode, fin = frame.fin, len = frame.payload.len(), "websocket frame");

            match frame.opcode {
                Opcode::Ping => {
                    self.connection(out).send_frame(Frame::pong(frame.payload));
                }
                Opcode::Pong => {}
                Opcode::Close => {
                    let code = match frame.close_code() {
                        Ok(code) => code,
                        Err(e) => {
                            self.fail(out, &e);
                            return Flow::Close;
                        }
                    };
                    debug!(remote_addr = %out.remote_addr(), code, "peer closed websocket");
                    self.connection(out).send_frame(Frame::close(code, ""));
                    self.closing = true;
                    return Flow::Close;
                }
                _ => match self.assembler.push(frame) {
                    Ok(Some(message)) => self.deliver(out, message),
                    Ok(None) => {}
                    Err(e) => {
                        self.fail(out, &e);
                        return Flow::Close;
                    }
                },
            }
        }
    }

    /// Runs the session's close callback once; `going_away` first tells the peer.
    pub fn on_close(&mut self, out: &mut dyn HttpResponse, going_away: bool) {
        if self.closed {
            return;
        }
        self.closed = true;

        let mut closing = self.closing;
        let mut connection = WebSocketConnection::new(out, self.charset, &mut closing);
        if going_away {
            connection.close(close_code::GOING_AWAY, "");
        }
        self.session.on_close(&mut connection);
        self.closing = closing;
    }

    fn deliver(&mut self, out: &mut dyn HttpResponse, message: Message) {
        let mut closing = self.closing;
        let mut connection = WebSocketConnection::new(out, self.charset, &mut closing);

        let result: Result<(), HandlerError> = match &message {
            Message::Text(payload) => match self.charset.decode(payload) {
                Ok(text) => self.session.on_message(&mut connection, &text),
                Err(e) => {
                    let e = WsError::from(e);
                    self.session.on_error(&mut connection, &e.to_string());
                    connection.close(e.close_code(), "");
                    Ok(())
                }
            },
            Message::Binary(payload) => self.session.on_binary_message(&mut connection, payload),
        };

        if let Err(e) = result {
            if self.session.on_exception(&mut connection, &e) {
                connection.close(close_code::INTERNAL_ERROR, "");
            }
        }
        self.closing = closing;
    }

    fn fail(&mut self, out: &mut dyn HttpResponse, e: &WsError) {
        warn!(remote_addr = %out.remote_addr(), cause = %e, "websocket protocol error, closing");
        let mut closing = self.closing;
        let mut connection = WebSocketConnection::new(out, self.charset, &mut closing);
        self.session.on_error(&mut connection, &e.to_string());
        connection.close(e.close_code(), "");
        self.closing = closing;
    }

    fn connection<'a>(&'a mut self, out: &'a mut dyn HttpResponse) -> WebSocketConnection<'a> {
        WebSocketConnection::new(out, self.charset, &mut self.closing)
    }
}

impl fmt::Debug for WebSocketStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketStream")
            .field("charset", &self.charset)
            .field("closing", &self.closing)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::codec::{RecordingResponse, RequestDecoder};
    use crate::handler::{Handler, Next};
    use crate::protocol::HttpRequest;
    use crate::websocket::{WebSocketHandler, WebSocketRequestHandler};
    use bytes::Bytes;

    const MASK: [u8; 4] = [1, 2, 3, 4];

    #[derive(Default)]
    struct Echo {
        events: Mutex<Vec<String>>,
    }

    impl WebSocketHandler<()> for Echo {
        type State = u32;

        fn on_open(&self, connection: &mut WebSocketConnection<'_>, request: &HttpRequest, _: &mut ()) -> u32 {
            self.events.lock().unwrap().push(format!("open {}", request.path()));
            connection.send("welcome");
            0
        }

        fn on_message(&self, connection: &mut WebSocketConnection<'_>, count: &mut u32, message: &str) -> Result<(), HandlerError> {
            *count += 1;
            if message == "boom" {
                return Err("boom".into());
            }
            connection.send(message);
            Ok(())
        }

        fn on_close(&self, _: &mut WebSocketConnection<'_>, count: u32) {
            self.events.lock().unwrap().push(format!("close after {count}"));
        }

        fn on_error(&self, _: &mut WebSocketConnection<'_>, _: &mut u32, message: &str) {
            self.events.lock().unwrap().push(format!("error {message}"));
        }
    }

    fn open(handler: Arc<Echo>, out: &mut RecordingResponse) -> WebSocketStream {
        let raw = "GET /ws HTTP/1.1\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\
                   Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\nSec-WebSocket-Version: 13\r\n\r\n";
        let mut buf = BytesMut::from(raw);
        let request = RequestDecoder::new("127.0.0.1:1".parse().unwrap()).decode(&mut buf).unwrap().unwrap();

        let route = WebSocketRequestHandler::from_arc(handler, Charset::Utf8);
        match route.start(&request, out, &mut ()).unwrap() {
            Next::Upgrade(upgrade) => WebSocketStream::new(upgrade, Charset::Utf8, 1024),
            other => panic!("expected upgrade, got {other:?}"),
        }
    }

    fn client(frame: Frame) -> BytesMut {
        let mut buf = BytesMut::new();
        frame.write_to(Some(MASK), &mut buf);
        buf
    }

    fn server_frames(out: &RecordingResponse) -> Vec<Frame> {
        let mut codec = FrameCodec::client();
        out.frames
            .iter()
            .skip(1)
            .map(|bytes| codec.decode(&mut BytesMut::from(&bytes[..])).unwrap().unwrap())
            .collect()
    }

    #[test]
    fn handshake_then_echo() {
        let handler = Arc::new(Echo::default());
        let mut out = RecordingResponse::default();
        let mut stream = open(handler.clone(), &mut out);

        assert!(out.frames[0].starts_with(b"HTTP/1.1 101 Switching Protocols\r\n"));

        let mut input = client(Frame::new(false, Opcode::Text, "hel"));
        input.extend_from_slice(&client(Frame::ping("p")));
        input.extend_from_slice(&client(Frame::new(true, Opcode::Continuation, "lo")));
        assert_eq!(stream.on_bytes(&mut input, &mut out), Flow::Continue);
        assert!(input.is_empty());

        let frames = server_frames(&out);
        assert_eq!(frames[0], Frame::text("welcome"));
        assert_eq!(frames[1], Frame::pong("p"));
        assert_eq!(frames[2], Frame::text("hello"));

        let mut input = client(Frame::close(Some(1000), ""));
        assert_eq!(stream.on_bytes(&mut input, &mut out), Flow::Close);
        assert_eq!(server_frames(&out)[3].close_code().unwrap(), Some(1000));

        stream.on_close(&mut out, false);
        stream.on_close(&mut out, false);
        assert_eq!(*handler.events.lock().unwrap(), vec!["open /ws", "close after 1"]);
    }

    #[test]
    fn invalid_utf8_closes_with_1007() {
        let handler = Arc::new(Echo::default());
        let mut out = RecordingResponse::default();
        let mut stream = open(handler.clone(), &mut out);

        let mut input = client(Frame::text(Bytes::from_static(&[0xff, 0xfe])));
        stream.on_bytes(&mut input, &mut out);
        let mut input = client(Frame::text("ignored"));
        assert_eq!(stream.on_bytes(&mut input, &mut out), Flow::Close);

        let frames = server_frames(&out);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].close_code().unwrap(), Some(close_code::INVALID_PAYLOAD));
        assert!(handler.events.lock().unwrap()[1].starts_with("error invalid text payload"));
    }

    #[test]
    fn callback_error_closes_with_1011() {
        let mut out = RecordingResponse::default();
        let mut stream = open(Arc::new(Echo::default()), &mut out);

        let mut input = client(Frame::text("boom"));
        assert_eq!(stream.on_bytes(&mut input, &mut out), Flow::Close);
        assert_eq!(server_frames(&out)[1].close_code().unwrap(), Some(close_code::INTERNAL_ERROR));
    }

    #[test]
    fn unmasked_frame_is_protocol_error() {
        let handler = Arc::new(Echo::default());
        let mut out = RecordingResponse::default();
        let mut stream = open(handler.clone(), &mut out);

        let mut input = BytesMut::new();
        Frame::text("plain").write_to(None, &mut input);
        assert_eq!(stream.on_bytes(&mut input, &mut out), Flow::Close);
        assert_eq!(server_frames(&out)[1].close_code().unwrap(), Some(close_code::PROTOCOL_ERROR));

        stream.on_close(&mut out, true);
        assert_eq!(server_frames(&out).len(), 2, "no second close frame");
        assert_eq!(handler.events.lock().unwrap().last().unwrap(), "close after 0");
    }

    #[test]
    fn reserved_close_code_is_protocol_error() {
        let handler = Arc::new(Echo::default());
        let mut out = RecordingResponse::default();
        let mut stream = open(handler.clone(), &mut out);

        let mut input = client(Frame::new(true, Opcode::Close, 1005u16.to_be_bytes().to_vec()));
        assert_eq!(stream.on_bytes(&mut input, &mut out), Flow::Close);
        assert_eq!(server_frames(&out)[1].close_code().unwrap(), Some(close_code::PROTOCOL_ERROR));
        assert_eq!(handler.events.lock().unwrap()[1], "error invalid close frame payload");
    }

    #[test]
    fn going_away_on_shutdown() {
        let mut out = RecordingResponse::default();
        let mut stream = open(Arc::new(Echo::default()), &mut out);

        stream.on_close(&mut out, true);
        assert_eq!(server_frames(&out)[1].close_code().unwrap(), Some(close_code::GOING_AWAY));
    }

    #[test]
    fn bad_handshake_is_rejected() {
        let mut buf = BytesMut::from("GET /ws HTTP/1.1\r\nHost: a\r\n\r\n");
        let request = RequestDecoder::new("127.0.0.1:1".parse().unwrap()).decode(&mut buf).unwrap().unwrap();
        let mut out = RecordingResponse::default();

        let route = WebSocketRequestHandler::new(Echo::default(), Charset::Utf8);
        assert!(matches!(route.start(&request, &mut out, &mut ()).unwrap(), Next::Close));
        assert_eq!(&out.frames[0][..], b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n");
    }
}
