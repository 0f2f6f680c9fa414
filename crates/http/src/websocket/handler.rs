use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use http::StatusCode;
use tracing::{error, warn};

use crate::codec::{HttpResponse, HttpResponseExt};
use crate::handler::{Handler, Next, Upgrade};
use crate::protocol::{Charset, HandlerError, HttpRequest};
use crate::websocket::{WebSocketConnection, handshake};

/// Application callbacks for one WebSocket route.
///
/// A single handler serves every connection upgraded on its route. State belonging to
/// one connection is created by [`on_open`](WebSocketHandler::on_open) and passed back
/// to every later callback for that connection.
pub trait WebSocketHandler<S>: Send + Sync + 'static {
    type State: 'static;

    fn on_open(&self, connection: &mut WebSocketConnection<'_>, request: &HttpRequest, session: &mut S) -> Self::State;

    fn on_message(
        &self,
        connection: &mut WebSocketConnection<'_>,
        state: &mut Self::State,
        message: &str,
    ) -> Result<(), HandlerError>;

    fn on_binary_message(
        &self,
        _connection: &mut WebSocketConnection<'_>,
        _state: &mut Self::State,
        _message: &[u8],
    ) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Runs exactly once, when the connection goes away for any reason.
    fn on_close(&self, _connection: &mut WebSocketConnection<'_>, _state: Self::State) {}

    /// A protocol violation by the peer; the connection closes afterwards.
    fn on_error(&self, connection: &mut WebSocketConnection<'_>, _state: &mut Self::State, message: &str) {
        warn!(remote_addr = %connection.remote_addr(), message, "websocket protocol error");
    }

    /// A callback returned an error; returning `true` closes the connection.
    fn on_exception(&self, connection: &mut WebSocketConnection<'_>, _state: &mut Self::State, error: &HandlerError) -> bool {
        error!(remote_addr = %connection.remote_addr(), cause = %error, "websocket callback failed");
        true
    }
}

/// An open WebSocket with its handler and state bound together.
pub trait WebSocketSession {
    fn on_message(&mut self, connection: &mut WebSocketConnection<'_>, message: &str) -> Result<(), HandlerError>;

    fn on_binary_message(&mut self, connection: &mut WebSocketConnection<'_>, message: &[u8]) -> Result<(), HandlerError>;

    fn on_error(&mut self, connection: &mut WebSocketConnection<'_>, message: &str);

    fn on_exception(&mut self, connection: &mut WebSocketConnection<'_>, error: &HandlerError) -> bool;

    /// Later calls after the first are ignored.
    fn on_close(&mut self, connection: &mut WebSocketConnection<'_>);
}

struct OpenWebSocket<H: WebSocketHandler<S>, S> {
    handler: Arc<H>,
    state: Option<H::State>,
    _session: PhantomData<fn(&mut S)>,
}

impl<H: WebSocketHandler<S>, S> WebSocketSession for OpenWebSocket<H, S> {
    fn on_message(&mut self, connection: &mut WebSocketConnection<'_>, message: &str) -> Result<(), HandlerError> {
        match &mut self.state {
            Some(state) => self.handler.on_message(connection, state, message),
            None => Ok(()),
        }
    }

    fn on_binary_message(&mut self, connection: &mut WebSocketConnection<'_>, message: &[u8]) -> Result<(), HandlerError> {
        match &mut self.state {
            Some(state) => self.handler.on_binary_message(connection, state, message),
            None => Ok(()),
        }
    }

    fn on_error(&mut self, connection: &mut WebSocketConnection<'_>, message: &str) {
        if let Some(state) = &mut self.state {
            self.handler.on_error(connection, state, message);
        }
    }

    fn on_exception(&mut self, connection: &mut WebSocketConnection<'_>, error: &HandlerError) -> bool {
        match &mut self.state {
            Some(state) => self.handler.on_exception(connection, state, error),
            None => true,
        }
    }

    fn on_close(&mut self, connection: &mut WebSocketConnection<'_>) {
        if let Some(state) = self.state.take() {
            self.handler.on_close(connection, state);
        }
    }
}

/// The HTTP side of a WebSocket route: validates the upgrade and opens the session.
///
/// A request that is not a valid upgrade gets `400 Bad Request` and the connection closes.
pub struct WebSocketRequestHandler<H> {
    handler: Arc<H>,
    charset: Charset,
}

impl<H> WebSocketRequestHandler<H> {
    pub fn new(handler: H, charset: Charset) -> Self {
        Self::from_arc(Arc::new(handler), charset)
    }

    pub fn from_arc(handler: Arc<H>, charset: Charset) -> Self {
        Self { handler, charset }
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }
}

impl<H> fmt::Debug for WebSocketRequestHandler<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketRequestHandler").field("charset", &self.charset).finish_non_exhaustive()
    }
}

impl<S: 'static, H: WebSocketHandler<S>> Handler<S> for WebSocketRequestHandler<H> {
    fn start(&self, request: &HttpRequest, response: &mut dyn HttpResponse, session: &mut S) -> Result<Next, HandlerError> {
        let accept = match handshake::validate(request) {
            Ok(accept) => accept,
            Err(e) => {
                warn!(remote_addr = %request.remote_addr(), path = request.path(), cause = %e, "rejecting websocket upgrade");
                response.send_status(StatusCode::BAD_REQUEST);
                return Ok(Next::Close);
            }
        };

        if response.send_websocket_handshake(&accept, None).is_closed() {
            return Ok(Next::Close);
        }

        let mut closing = false;
        let state = {
            let mut connection = WebSocketConnection::new(&mut *response, self.charset, &mut closing);
            self.handler.on_open(&mut connection, request, session)
        };

        let open = OpenWebSocket { handler: Arc::clone(&self.handler), state: Some(state), _session: PhantomData };
        Ok(Next::Upgrade(Upgrade::new(Box::new(open), closing)))
    }
}
