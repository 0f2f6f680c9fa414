use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use nio_http::codec::HttpResponse;
use nio_http::handler::{Handler, Next};
use nio_http::protocol::{HandlerError, HttpRequest, SendResult};

use crate::decorator::Decorator;

/// Told about every frame sent through an [`ObservedResponse`].
pub trait SendObserver: Send + Sync {
    fn on_send(&self, remote_addr: SocketAddr, len: usize, result: SendResult);
}

impl<F> SendObserver for F
where
    F: Fn(SocketAddr, usize, SendResult) + Send + Sync,
{
    fn on_send(&self, remote_addr: SocketAddr, len: usize, result: SendResult) {
        self(remote_addr, len, result);
    }
}

/// Forwards the response capability to `target`, reporting each send to an observer.
pub struct ObservedResponse<'a, O: ?Sized> {
    target: &'a mut dyn HttpResponse,
    observer: &'a O,
}

impl<'a, O: SendObserver + ?Sized> ObservedResponse<'a, O> {
    pub fn new(target: &'a mut dyn HttpResponse, observer: &'a O) -> Self {
        Self { target, observer }
    }
}

impl<O: SendObserver + ?Sized> HttpResponse for ObservedResponse<'_, O> {
    fn send(&mut self, full_response: Bytes) -> SendResult {
        let len = full_response.len();
        let result = self.target.send(full_response);
        self.observer.on_send(self.target.remote_addr(), len, result);
        result
    }

    fn remote_addr(&self) -> SocketAddr {
        self.target.remote_addr()
    }
}

impl<O: ?Sized> fmt::Debug for ObservedResponse<'_, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservedResponse").field("remote_addr", &self.target.remote_addr()).finish_non_exhaustive()
    }
}

/// Wraps a handler so every send it makes goes through an [`ObservedResponse`].
///
/// Only sends made while the request is handled are seen, including the handshake
/// reply and anything sent from `on_open`. Frames written after a WebSocket upgrade
/// go straight to the connection.
pub struct SendObserverDecorator<O> {
    observer: Arc<O>,
}

impl<O: SendObserver> SendObserverDecorator<O> {
    pub fn new(observer: O) -> Self {
        Self { observer: Arc::new(observer) }
    }
}

impl<H, O: SendObserver> Decorator<H> for SendObserverDecorator<O> {
    type Out = ObservedHandler<H, O>;

    fn decorate(&self, raw: H) -> Self::Out {
        ObservedHandler { inner: raw, observer: Arc::clone(&self.observer) }
    }
}

impl<O> fmt::Debug for SendObserverDecorator<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendObserverDecorator").finish_non_exhaustive()
    }
}

pub struct ObservedHandler<H, O> {
    inner: H,
    observer: Arc<O>,
}

impl<S, H: Handler<S>, O: SendObserver> Handler<S> for ObservedHandler<H, O> {
    fn start(&self, request: &HttpRequest, response: &mut dyn HttpResponse, session: &mut S) -> Result<Next, HandlerError> {
        let mut observed = ObservedResponse::new(response, self.observer.as_ref());
        self.inner.start(request, &mut observed, session)
    }
}

impl<H, O> fmt::Debug for ObservedHandler<H, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservedHandler").finish_non_exhaustive()
    }
}
