//! Request handler traits and utilities.
//!
//! A [`Handler`] is invoked on the reactor thread that owns the connection, once per
//! parsed request. It writes its reply through the [`HttpResponse`] it is given and
//! returns a [`Next`] telling the connection what to do afterwards. Handlers are shared
//! by every reactor, hence `Send + Sync`; per-connection state lives in the session
//! object produced by a [`SessionFactory`].

use std::fmt;
use std::marker::PhantomData;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::codec::HttpResponse;
use crate::protocol::{HandlerError, HttpRequest};
use crate::websocket::WebSocketSession;

/// What the connection does once a handler returned.
#[derive(Debug)]
pub enum Next {
    /// Keep the connection and parse the next request.
    ReadRequest,
    /// Flush whatever was sent and close.
    Close,
    /// The handshake reply was sent, switch the connection to WebSocket framing.
    Upgrade(Upgrade),
}

/// A WebSocket session ready to take over a connection.
pub struct Upgrade {
    pub(crate) session: Box<dyn WebSocketSession>,
    pub(crate) closing: bool,
}

impl Upgrade {
    /// `closing` records that a close frame already went out during the open callback.
    pub fn new(session: Box<dyn WebSocketSession>, closing: bool) -> Self {
        Self { session, closing }
    }
}

impl fmt::Debug for Upgrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upgrade").field("closing", &self.closing).finish_non_exhaustive()
    }
}

pub trait Handler<S>: Send + Sync {
    fn start(&self, request: &HttpRequest, response: &mut dyn HttpResponse, session: &mut S) -> Result<Next, HandlerError>;
}

impl<S, T: Handler<S> + ?Sized> Handler<S> for Arc<T> {
    fn start(&self, request: &HttpRequest, response: &mut dyn HttpResponse, session: &mut S) -> Result<Next, HandlerError> {
        (**self).start(request, response, session)
    }
}

impl<S, T: Handler<S> + ?Sized> Handler<S> for Box<T> {
    fn start(&self, request: &HttpRequest, response: &mut dyn HttpResponse, session: &mut S) -> Result<Next, HandlerError> {
        (**self).start(request, response, session)
    }
}

/// Adapts a closure into a [`Handler`] that keeps the connection open afterwards.
pub struct HandlerFn<F, S> {
    f: F,
    _session: PhantomData<fn(&mut S)>,
}

impl<F, S> fmt::Debug for HandlerFn<F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFn").finish_non_exhaustive()
    }
}

impl<F, S> Handler<S> for HandlerFn<F, S>
where
    F: Fn(&HttpRequest, &mut dyn HttpResponse, &mut S) -> Result<(), HandlerError> + Send + Sync,
{
    fn start(&self, request: &HttpRequest, response: &mut dyn HttpResponse, session: &mut S) -> Result<Next, HandlerError> {
        (self.f)(request, response, session)?;
        Ok(Next::ReadRequest)
    }
}

pub fn handler_fn<S, F>(f: F) -> HandlerFn<F, S>
where
    F: Fn(&HttpRequest, &mut dyn HttpResponse, &mut S) -> Result<(), HandlerError> + Send + Sync,
{
    HandlerFn { f, _session: PhantomData }
}

/// Facts about a freshly accepted connection, handed to [`SessionFactory::create`].
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub id: u64,
    pub remote_addr: SocketAddr,
    pub reactor: Arc<str>,
}

/// Creates and disposes the per-connection session object.
///
/// `create` runs on the owning reactor when the connection registers; `on_close` runs
/// exactly once when the connection is torn down, whatever the cause.
pub trait SessionFactory: Send + Sync + 'static {
    type Session: 'static;

    fn create(&self, info: &ConnectionInfo) -> Self::Session;

    fn on_close(&self, _session: Self::Session) {}
}

/// Factory for servers that need no per-connection state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSession;

impl SessionFactory for NoSession {
    type Session = ();

    fn create(&self, _info: &ConnectionInfo) -> Self::Session {}
}

impl<F: SessionFactory + ?Sized> SessionFactory for Arc<F> {
    type Session = F::Session;

    fn create(&self, info: &ConnectionInfo) -> Self::Session {
        (**self).create(info)
    }

    fn on_close(&self, session: Self::Session) {
        (**self).on_close(session)
    }
}
