use std::io;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use http::StatusCode;
use tokio::select;
use tokio::time::Instant;
use tokio_util::codec::Decoder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::codec::{HttpResponseExt, RequestDecoder};
use crate::connection::{ConnectionConfig, MessageWriter, Socket};
use crate::handler::{ConnectionInfo, Handler, Next, SessionFactory};
use crate::protocol::{HttpError, HttpRequest, ParseError, SendError};
use crate::websocket::{Flow, WebSocketStream};

/// Where a connection is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ReadingHeaders,
    Dispatching,
    WebSocketUpgraded,
    /// No more input is processed; queued output is flushed, then the connection closes.
    Closing,
    Closed,
}

/// Result of handling one read-readiness event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The socket has no more data for now.
    Drained,
    /// The read budget ran out with data possibly left in the socket.
    Yielded,
    /// The connection stopped reading.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    PeerClosed,
    Malformed,
    Requested,
    HandlerFailed,
    WebSocketClosed,
    IdleTimeout,
    CloseTimeout,
    ReadError,
    WriteError,
    Shutdown,
}

impl CloseReason {
    /// Whether queued output is still worth flushing.
    fn flushes(self) -> bool {
        !matches!(self, Self::CloseTimeout | Self::ReadError | Self::WriteError | Self::Shutdown)
    }
}

enum ReadState {
    Http(RequestDecoder),
    WebSocket(WebSocketStream),
}

/// One accepted connection, owned by a single reactor for its whole life.
///
/// Drives the read, parse, dispatch and write cycle. Input is read in chunks of
/// `read_buffer_size` bytes, at most `max_read_loops` times per readiness event. Each
/// complete request goes to the handler, which decides whether the connection keeps
/// reading HTTP, switches to WebSocket framing, or closes.
///
/// Teardown runs exactly once, whatever ends the connection: the WebSocket close
/// callback first if the connection was upgraded, then [`SessionFactory::on_close`].
pub struct HttpConnection<W: Socket, F: SessionFactory> {
    id: u64,
    socket: Rc<W>,
    writer: MessageWriter<W>,
    read_buf: BytesMut,
    scratch: Box<[u8]>,
    read_state: ReadState,
    stage: Stage,
    close_reason: Option<CloseReason>,
    /// Set on entering [`Stage::Closing`]; the connection is torn down when it passes.
    close_deadline: Option<Instant>,
    /// The error that ended the connection, if one did.
    cause: Option<HttpError>,
    handler: Arc<dyn Handler<F::Session>>,
    factory: Arc<F>,
    session: Option<F::Session>,
    config: Arc<ConnectionConfig>,
    remote_addr: SocketAddr,
}

impl<W: Socket, F: SessionFactory> HttpConnection<W, F> {
    /// Wraps `socket` and creates the connection's session.
    pub fn new(
        socket: W,
        info: &ConnectionInfo,
        handler: Arc<dyn Handler<F::Session>>,
        factory: Arc<F>,
        config: Arc<ConnectionConfig>,
    ) -> Self {
        let socket = Rc::new(socket);
        let session = factory.create(info);
        Self {
            id: info.id,
            writer: MessageWriter::new(Rc::clone(&socket), info.remote_addr),
            socket,
            read_buf: BytesMut::with_capacity(config.read_buffer_size),
            scratch: vec![0u8; config.read_buffer_size.max(1)].into_boxed_slice(),
            read_state: ReadState::Http(RequestDecoder::with_max_body_size(info.remote_addr, config.max_body_size)),
            stage: Stage::ReadingHeaders,
            close_reason: None,
            close_deadline: None,
            cause: None,
            handler,
            factory,
            session: Some(session),
            config,
            remote_addr: info.remote_addr,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn buffered_bytes(&self) -> usize {
        self.writer.buffered_bytes()
    }

    pub fn close_cause(&self) -> Option<&HttpError> {
        self.cause.as_ref()
    }

    /// Runs the connection until it closes or `shutdown` fires.
    pub async fn process(mut self, shutdown: CancellationToken) {
        let socket = Rc::clone(&self.socket);
        while self.stage != Stage::Closed {
            let want_write = self.writer.has_pending();
            let want_read = self.stage != Stage::Closing;
            if !want_read && !want_write {
                self.teardown();
                break;
            }

            select! {
                biased;

                () = shutdown.cancelled() => self.shutdown(),

                result = socket.writable(), if want_write => match result {
                    Ok(()) => self.on_writable(),
                    Err(e) => {
                        warn!(id = self.id, cause = %e, "write readiness failed");
                        self.cause = Some(SendError::from(e).into());
                        self.begin_close(CloseReason::WriteError);
                    }
                },

                result = socket.readable(), if want_read => match result {
                    Ok(()) => {
                        if self.on_readable() == ReadOutcome::Yielded {
                            tokio::task::yield_now().await;
                        }
                    }
                    Err(e) => {
                        warn!(id = self.id, cause = %e, "read readiness failed");
                        self.cause = Some(e.into());
                        self.begin_close(CloseReason::ReadError);
                    }
                },

                () = idle(self.config.read_timeout), if want_read => {
                    debug!(id = self.id, remote_addr = %self.remote_addr, "idle timeout");
                    self.begin_close(CloseReason::IdleTimeout);
                }

                () = deadline(self.close_deadline), if !want_read => {
                    debug!(id = self.id, remote_addr = %self.remote_addr, pending = self.writer.buffered_bytes(), "close timed out");
                    self.begin_close(CloseReason::CloseTimeout);
                }
            }
        }
    }

    /// Reads and processes input until the socket blocks or the read budget is spent.
    pub fn on_readable(&mut self) -> ReadOutcome {
        for _ in 0..self.config.max_read_loops {
            if !self.is_reading() {
                return ReadOutcome::Closed;
            }

            match self.socket.try_read(&mut self.scratch) {
                Ok(0) => {
                    debug!(id = self.id, remote_addr = %self.remote_addr, "peer closed connection");
                    self.begin_close(CloseReason::PeerClosed);
                    return ReadOutcome::Closed;
                }
                Ok(n) => {
                    self.read_buf.extend_from_slice(&self.scratch[..n]);
                    self.process_input();
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return ReadOutcome::Drained,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!(id = self.id, remote_addr = %self.remote_addr, cause = %e, "read failed");
                    self.cause = Some(e.into());
                    self.begin_close(CloseReason::ReadError);
                    return ReadOutcome::Closed;
                }
            }
        }

        if self.is_reading() { ReadOutcome::Yielded } else { ReadOutcome::Closed }
    }

    /// Flushes queued output; finishes a pending close once everything is written.
    pub fn on_writable(&mut self) {
        if self.stage == Stage::Closed {
            return;
        }
        match self.writer.flush() {
            Ok(0) if self.stage == Stage::Closing => self.teardown(),
            Ok(_) => {}
            Err(_) => self.begin_close(CloseReason::WriteError),
        }
    }

    /// Closes immediately, telling an upgraded peer the server is going away.
    pub fn shutdown(&mut self) {
        self.begin_close(CloseReason::Shutdown);
    }

    fn is_reading(&self) -> bool {
        matches!(self.stage, Stage::ReadingHeaders | Stage::Dispatching | Stage::WebSocketUpgraded)
    }

    fn process_input(&mut self) {
        while self.is_reading() {
            match &mut self.read_state {
                ReadState::Http(decoder) => match decoder.decode(&mut self.read_buf) {
                    Ok(Some(request)) => self.dispatch(request),
                    Ok(None) => return,
                    Err(e) => self.reject(e),
                },
                ReadState::WebSocket(stream) => {
                    let flow = stream.on_bytes(&mut self.read_buf, &mut self.writer);
                    if flow == Flow::Close {
                        self.begin_close(CloseReason::WebSocketClosed);
                    } else if !self.writer.has_failed() {
                        return;
                    }
                }
            }

            if self.writer.has_failed() {
                self.begin_close(CloseReason::WriteError);
            }
        }
    }

    fn reject(&mut self, e: ParseError) {
        warn!(id = self.id, remote_addr = %self.remote_addr, cause = %e, "malformed request");
        self.cause = Some(e.into());
        self.writer.send_status(StatusCode::BAD_REQUEST);
        self.begin_close(CloseReason::Malformed);
    }

    fn dispatch(&mut self, request: HttpRequest) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        self.stage = Stage::Dispatching;

        let handler = &self.handler;
        let writer = &mut self.writer;
        let result = panic::catch_unwind(AssertUnwindSafe(|| handler.start(&request, writer, session)));

        let next = match result {
            Ok(Ok(next)) => next,
            Ok(Err(e)) => {
                error!(id = self.id, path = request.path(), cause = %e, "handler failed, closing connection");
                self.begin_close(CloseReason::HandlerFailed);
                return;
            }
            Err(_) => {
                error!(id = self.id, path = request.path(), "handler panicked, closing connection");
                self.begin_close(CloseReason::HandlerFailed);
                return;
            }
        };

        match next {
            Next::ReadRequest if request.wants_close() => self.begin_close(CloseReason::Requested),
            Next::ReadRequest => self.stage = Stage::ReadingHeaders,
            Next::Close => self.begin_close(CloseReason::Requested),
            Next::Upgrade(upgrade) => {
                debug!(id = self.id, remote_addr = %self.remote_addr, path = request.path(), "upgraded to websocket");
                let closing = upgrade.closing;
                let stream = WebSocketStream::new(upgrade, self.config.websocket_charset, self.config.max_frame_size);
                self.read_state = ReadState::WebSocket(stream);
                self.stage = Stage::WebSocketUpgraded;
                if closing {
                    self.begin_close(CloseReason::WebSocketClosed);
                }
            }
        }
    }

    fn begin_close(&mut self, reason: CloseReason) {
        match self.stage {
            Stage::Closed => return,
            Stage::Closing if reason.flushes() => return,
            Stage::Closing => {
                self.close_reason = Some(reason);
                self.teardown();
                return;
            }
            _ => {}
        }
        debug!(id = self.id, remote_addr = %self.remote_addr, ?reason, "closing connection");
        self.close_reason = Some(reason);
        self.read_buf.clear();

        if reason.flushes() && self.writer.flush().is_ok_and(|remaining| remaining > 0) {
            self.stage = Stage::Closing;
            self.close_deadline = Some(Instant::now() + self.config.close_deadline());
        } else {
            self.teardown();
        }
    }

    fn teardown(&mut self) {
        if self.stage == Stage::Closed {
            return;
        }
        self.stage = Stage::Closed;

        if let ReadState::WebSocket(stream) = &mut self.read_state {
            let going_away = self.close_reason == Some(CloseReason::Shutdown);
            stream.on_close(&mut self.writer, going_away);
            if going_away {
                // best effort, the socket closes right after
                let _ = self.writer.flush();
            }
        }
        if self.cause.is_none() {
            self.cause = self.writer.take_failure().map(|e| SendError::from(e).into());
        }
        self.writer.close();

        if let Some(session) = self.session.take() {
            self.factory.on_close(session);
        }
        match &self.cause {
            Some(cause) => {
                debug!(id = self.id, remote_addr = %self.remote_addr, reason = ?self.close_reason, %cause, "connection closed");
            }
            None => debug!(id = self.id, remote_addr = %self.remote_addr, reason = ?self.close_reason, "connection closed"),
        }
    }
}

impl<W: Socket, F: SessionFactory> Drop for HttpConnection<W, F> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<W: Socket, F: SessionFactory> std::fmt::Debug for HttpConnection<W, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnection")
            .field("id", &self.id)
            .field("remote_addr", &self.remote_addr)
            .field("stage", &self.stage)
            .field("buffered", &self.writer.buffered_bytes())
            .finish_non_exhaustive()
    }
}

async fn idle(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending().await,
    }
}

async fn deadline(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use indoc::indoc;

    use super::*;
    use crate::codec::HttpResponse;
    use crate::connection::socket::mock::MockSocket;
    use crate::handler::handler_fn;
    use crate::protocol::{Charset, HandlerError, SendResult};
    use crate::websocket::{Frame, FrameCodec, WebSocketConnection, WebSocketHandler, WebSocketRequestHandler};

    /// Counts requests per connection and records the count at close.
    #[derive(Debug, Default)]
    struct Recorder {
        closed: Mutex<Vec<u32>>,
    }

    impl SessionFactory for Recorder {
        type Session = u32;

        fn create(&self, _info: &ConnectionInfo) -> u32 {
            0
        }

        fn on_close(&self, session: u32) {
            self.closed.lock().unwrap().push(session);
        }
    }

    fn info() -> ConnectionInfo {
        ConnectionInfo { id: 1, remote_addr: "127.0.0.1:5555".parse().unwrap(), reactor: Arc::from("test") }
    }

    fn echo_path() -> Arc<dyn Handler<u32>> {
        Arc::new(handler_fn(|request: &HttpRequest, response: &mut dyn HttpResponse, hits: &mut u32| {
            *hits += 1;
            if request.path() == "/fail" {
                return Err(HandlerError::from("boom"));
            }
            response.send_text(StatusCode::OK, &mime::TEXT_PLAIN, request.path(), Charset::Utf8);
            Ok(())
        }))
    }

    fn connection(
        socket: MockSocket,
        handler: Arc<dyn Handler<u32>>,
        config: ConnectionConfig,
    ) -> (HttpConnection<MockSocket, Recorder>, Arc<Recorder>) {
        let factory = Arc::new(Recorder::default());
        let conn = HttpConnection::new(socket, &info(), handler, Arc::clone(&factory), Arc::new(config));
        (conn, factory)
    }

    fn written(conn: &HttpConnection<MockSocket, Recorder>) -> String {
        String::from_utf8(conn.socket.written()).unwrap()
    }

    #[test]
    fn keep_alive_requests_answered_in_order() {
        let socket = MockSocket::new();
        socket.push_input(indoc! {r##"
            GET /first HTTP/1.1
            Host: localhost

            GET /second HTTP/1.1
            Host: localhost

            "##});

        let (mut conn, factory) = connection(socket, echo_path(), ConnectionConfig::default());
        assert_eq!(conn.on_readable(), ReadOutcome::Drained);
        assert_eq!(conn.stage(), Stage::ReadingHeaders);

        let out = written(&conn);
        let first = out.find("/first").unwrap();
        let second = out.find("/second").unwrap();
        assert!(first < second);
        assert_eq!(out.matches("HTTP/1.1 200 OK").count(), 2);

        drop(conn);
        assert_eq!(*factory.closed.lock().unwrap(), vec![2]);
    }

    #[test]
    fn read_loop_is_bounded() {
        let socket = MockSocket::new();
        let mut input = b"GET / HTTP/1.1\r\nX-Pad: ".to_vec();
        input.resize(16 * 10, b'a');
        socket.push_input(input);

        let config = ConnectionConfig { read_buffer_size: 16, max_read_loops: 3, ..ConnectionConfig::default() };
        let (mut conn, _) = connection(socket, echo_path(), config);

        assert_eq!(conn.on_readable(), ReadOutcome::Yielded);
        assert_eq!(conn.socket.reads.get(), 3);
        assert_eq!(conn.read_buf.len(), 48);

        assert_eq!(conn.on_readable(), ReadOutcome::Yielded);
        assert_eq!(conn.socket.reads.get(), 6);
    }

    #[test]
    fn malformed_request_gets_400_then_closes() {
        let socket = MockSocket::new();
        socket.push_input("GET / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n");

        let (mut conn, factory) = connection(socket, echo_path(), ConnectionConfig::default());
        assert_eq!(conn.on_readable(), ReadOutcome::Closed);
        assert_eq!(conn.stage(), Stage::Closed);
        assert_eq!(written(&conn), "HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n");
        assert_eq!(*factory.closed.lock().unwrap(), vec![0]);
        assert!(matches!(
            conn.close_cause(),
            Some(HttpError::RequestError { source: ParseError::UnsupportedTransferEncoding })
        ));
    }

    #[test]
    fn connection_close_header_closes_after_flush() {
        let socket = MockSocket::new();
        socket.set_write_capacity(10);
        socket.push_input("GET /bye HTTP/1.1\r\nConnection: close\r\n\r\n");

        let (mut conn, factory) = connection(socket, echo_path(), ConnectionConfig::default());
        assert_eq!(conn.on_readable(), ReadOutcome::Closed);
        assert_eq!(conn.stage(), Stage::Closing);
        assert!(factory.closed.lock().unwrap().is_empty());

        conn.socket.set_write_capacity(usize::MAX);
        conn.on_writable();
        assert_eq!(conn.stage(), Stage::Closed);
        assert!(written(&conn).ends_with("/bye"));
        assert_eq!(*factory.closed.lock().unwrap(), vec![1]);
    }

    #[test]
    fn backpressure_drains_monotonically() {
        let results = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&results);
        let handler: Arc<dyn Handler<u32>> =
            Arc::new(handler_fn(move |_: &HttpRequest, response: &mut dyn HttpResponse, _: &mut u32| {
                let body = vec![b'z'; 4096];
                let result = response.send_response(StatusCode::OK, &mime::APPLICATION_OCTET_STREAM, None, &body, None);
                sink.lock().unwrap().push(result);
                Ok(())
            }));

        let socket = MockSocket::new();
        socket.set_write_capacity(1000);
        socket.push_input("GET /big HTTP/1.1\r\n\r\n");
        let (mut conn, _) = connection(socket, handler, ConnectionConfig::default());
        conn.on_readable();

        let first = results.lock().unwrap()[0];
        assert!(matches!(first, SendResult::Buffered(n) if n > 0));
        assert_eq!(conn.buffered_bytes(), first.buffered_bytes());

        let mut last = conn.buffered_bytes();
        while last > 0 {
            conn.socket.set_write_capacity(700);
            conn.on_writable();
            assert!(conn.buffered_bytes() < last);
            last = conn.buffered_bytes();
        }
        assert!(conn.socket.written().ends_with(&[b'z'; 4096]));
    }

    #[test]
    fn handler_error_closes_connection() {
        let socket = MockSocket::new();
        socket.push_input("GET /fail HTTP/1.1\r\n\r\nGET /never HTTP/1.1\r\n\r\n");

        let (mut conn, factory) = connection(socket, echo_path(), ConnectionConfig::default());
        assert_eq!(conn.on_readable(), ReadOutcome::Closed);
        assert_eq!(conn.stage(), Stage::Closed);
        assert!(!written(&conn).contains("/never"));
        assert_eq!(*factory.closed.lock().unwrap(), vec![1]);
    }

    #[test]
    fn session_closed_once_on_read_and_write_errors() {
        let socket = MockSocket::new();
        socket.push_input("GET /a HTTP/1.1\r\n\r\n");
        socket.push_read_error(io::ErrorKind::ConnectionReset);
        socket.fail_writes(io::ErrorKind::BrokenPipe);

        let (mut conn, factory) = connection(socket, echo_path(), ConnectionConfig::default());
        assert_eq!(conn.on_readable(), ReadOutcome::Closed);
        assert_eq!(conn.on_readable(), ReadOutcome::Closed);
        conn.on_writable();
        conn.shutdown();
        assert!(matches!(conn.close_cause(), Some(HttpError::ResponseError { source: SendError::Io { .. } })));
        drop(conn);

        assert_eq!(*factory.closed.lock().unwrap(), vec![1]);
    }

    #[test]
    fn read_error_is_the_close_cause() {
        let socket = MockSocket::new();
        socket.push_read_error(io::ErrorKind::ConnectionReset);

        let (mut conn, factory) = connection(socket, echo_path(), ConnectionConfig::default());
        assert_eq!(conn.on_readable(), ReadOutcome::Closed);
        assert_eq!(conn.stage(), Stage::Closed);
        assert!(matches!(conn.close_cause(), Some(HttpError::Io { source }) if source.kind() == io::ErrorKind::ConnectionReset));
        assert_eq!(*factory.closed.lock().unwrap(), vec![0]);
    }

    async fn run_to_end(conn: HttpConnection<MockSocket, Recorder>) {
        tokio::time::timeout(Duration::from_secs(2), conn.process(CancellationToken::new()))
            .await
            .expect("connection kept running");
    }

    #[tokio::test]
    async fn idle_connection_closes_after_read_timeout() {
        let config = ConnectionConfig { read_timeout: Some(Duration::from_millis(50)), ..ConnectionConfig::default() };
        let (conn, factory) = connection(MockSocket::new(), echo_path(), config);

        run_to_end(conn).await;
        assert_eq!(*factory.closed.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn closing_connection_gives_up_on_stalled_peer() {
        let socket = MockSocket::new();
        socket.set_write_capacity(10);
        socket.push_input("GET /bye HTTP/1.1\r\nConnection: close\r\n\r\n");

        let config = ConnectionConfig { read_timeout: Some(Duration::from_millis(50)), ..ConnectionConfig::default() };
        let (conn, factory) = connection(socket, echo_path(), config);

        run_to_end(conn).await;
        assert_eq!(*factory.closed.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn closing_deadline_applies_without_read_timeout() {
        let socket = MockSocket::new();
        socket.set_write_capacity(10);
        socket.push_input("GET /bye HTTP/1.1\r\nConnection: close\r\n\r\n");

        let config = ConnectionConfig { close_timeout: Duration::from_millis(50), ..ConnectionConfig::default() };
        let (conn, factory) = connection(socket, echo_path(), config);

        run_to_end(conn).await;
        assert_eq!(*factory.closed.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn peer_close_ends_processing() {
        let socket = MockSocket::new();
        socket.push_input("GET /a HTTP/1.1\r\n\r\n");
        socket.close_input();
        let (conn, factory) = connection(socket, echo_path(), ConnectionConfig::default());

        run_to_end(conn).await;
        assert_eq!(*factory.closed.lock().unwrap(), vec![1]);
    }

    struct Echo {
        closed: Arc<Mutex<Vec<&'static str>>>,
    }

    impl WebSocketHandler<u32> for Echo {
        type State = ();

        fn on_open(&self, _: &mut WebSocketConnection<'_>, _: &HttpRequest, _: &mut u32) {}

        fn on_message(&self, connection: &mut WebSocketConnection<'_>, _: &mut (), message: &str) -> Result<(), HandlerError> {
            connection.send(message);
            Ok(())
        }

        fn on_close(&self, _: &mut WebSocketConnection<'_>, (): ()) {
            self.closed.lock().unwrap().push("websocket");
        }
    }

    fn upgraded() -> (HttpConnection<MockSocket, Recorder>, Arc<Recorder>, Arc<Mutex<Vec<&'static str>>>) {
        let closed = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<dyn Handler<u32>> =
            Arc::new(WebSocketRequestHandler::new(Echo { closed: Arc::clone(&closed) }, Charset::Utf8));

        let socket = MockSocket::new();
        socket.push_input(indoc! {r##"
            GET /ws HTTP/1.1
            Upgrade: websocket
            Connection: Upgrade
            Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==
            Sec-WebSocket-Version: 13

            "##});
        let mut hello = BytesMut::new();
        Frame::text("hello").write_to(Some([9, 8, 7, 6]), &mut hello);
        socket.push_input(hello.to_vec());

        let (mut conn, factory) = connection(socket, handler, ConnectionConfig::default());
        assert_eq!(conn.on_readable(), ReadOutcome::Drained);
        assert_eq!(conn.stage(), Stage::WebSocketUpgraded);
        (conn, factory, closed)
    }

    #[test]
    fn websocket_echo_after_upgrade() {
        let (conn, _, _) = upgraded();

        let out = conn.socket.written();
        let head_end = out.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
        assert!(out.starts_with(b"HTTP/1.1 101 Switching Protocols\r\n"));

        let mut frames = BytesMut::from(&out[head_end..]);
        let frame = FrameCodec::client().decode(&mut frames).unwrap().unwrap();
        assert_eq!(frame, Frame::text("hello"));
        assert!(frames.is_empty());
    }

    #[test]
    fn shutdown_closes_websocket_before_session() {
        let (mut conn, factory, closed) = upgraded();
        conn.shutdown();

        assert_eq!(conn.stage(), Stage::Closed);
        assert_eq!(*closed.lock().unwrap(), vec!["websocket"]);
        assert_eq!(*factory.closed.lock().unwrap(), vec![0]);
        assert!(conn.socket.written().ends_with(&[0x88, 0x02, 0x03, 0xe9]));
    }
}
