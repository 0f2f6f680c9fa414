//! Echoes every WebSocket message back to its sender.
//!
//! Open http://127.0.0.1:8025/ in a browser, or talk to ws://127.0.0.1:8025/websockets/echo
//! with any WebSocket client.

use std::net::SocketAddr;
use std::time::Instant;

use http::StatusCode;
use nio_http::codec::{HttpResponse, HttpResponseExt};
use nio_http::handler::{ConnectionInfo, SessionFactory, handler_fn};
use nio_http::protocol::{Charset, HandlerError, HttpRequest, SendResult};
use nio_http::websocket::{WebSocketConnection, WebSocketHandler};
use nio_web::decorator::RequestLogDecorator;
use nio_web::{WebServer, WebServerConfigBuilder};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<body>
<input id="msg" value="hello"><button onclick="ws.send(msg.value)">send</button>
<pre id="log"></pre>
<script>
  const ws = new WebSocket(`ws://${location.host}/websockets/echo`);
  ws.onmessage = (e) => log.textContent += e.data + "\n";
  ws.onclose = () => log.textContent += "closed\n";
</script>
</body>
</html>
"#;

#[derive(Debug)]
struct ConnectionState {
    id: u64,
    remote_addr: SocketAddr,
    created: Instant,
}

#[derive(Debug)]
struct EchoState {
    connection_id: u64,
    messages: usize,
}

struct Sessions;

impl SessionFactory for Sessions {
    type Session = ConnectionState;

    fn create(&self, info: &ConnectionInfo) -> Self::Session {
        ConnectionState { id: info.id, remote_addr: info.remote_addr, created: Instant::now() }
    }

    fn on_close(&self, session: Self::Session) {
        info!(id = session.id, remote_addr = %session.remote_addr, lifetime = ?session.created.elapsed(), "session closed");
    }
}

struct Echo;

impl WebSocketHandler<ConnectionState> for Echo {
    type State = EchoState;

    fn on_open(&self, connection: &mut WebSocketConnection<'_>, request: &HttpRequest, session: &mut ConnectionState) -> EchoState {
        info!(id = session.id, remote_addr = %connection.remote_addr(), path = request.path(), "websocket open");
        EchoState { connection_id: session.id, messages: 0 }
    }

    fn on_message(&self, connection: &mut WebSocketConnection<'_>, state: &mut EchoState, message: &str) -> Result<(), HandlerError> {
        state.messages += 1;
        if let SendResult::Buffered(pending) = connection.send(message) {
            warn!(id = state.connection_id, pending, "peer is slow, reply buffered");
        }
        Ok(())
    }

    fn on_binary_message(&self, connection: &mut WebSocketConnection<'_>, state: &mut EchoState, message: &[u8]) -> Result<(), HandlerError> {
        state.messages += 1;
        connection.send_binary(message);
        Ok(())
    }

    fn on_close(&self, _connection: &mut WebSocketConnection<'_>, state: EchoState) {
        info!(id = state.connection_id, messages = state.messages, "websocket closed");
    }
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = WebServerConfigBuilder::new(Sessions)
        .add_websocket("/websockets/echo", Echo)
        .add(
            "/",
            handler_fn(|_: &HttpRequest, response: &mut dyn HttpResponse, _: &mut ConnectionState| {
                response.send_text(StatusCode::OK, &mime::TEXT_HTML, PAGE, Charset::Utf8);
                Ok(())
            }),
        )
        .with_decorator(RequestLogDecorator)
        .build();

    let server = WebServer::builder(config)
        .address("127.0.0.1:8025")
        .on_acceptor_end(|| info!("acceptor end"))
        .build()
        .expect("valid server config");
    let server = match server.start() {
        Ok(server) => server,
        Err(e) => {
            error!(cause = %e, "can't start server");
            return;
        }
    };
    info!(local_addr = %server.local_addr(), workers = server.reactors().workers().len(), "echo server running");

    let _ = tokio::signal::ctrl_c().await;
    server.dispose();
}
