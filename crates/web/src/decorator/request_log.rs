use std::time::Instant;

use nio_http::codec::HttpResponse;
use nio_http::handler::{Handler, Next};
use nio_http::protocol::{HandlerError, HttpRequest};
use tracing::info;

use crate::decorator::Decorator;

/// Wraps a handler in [`RequestLog`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestLogDecorator;

impl<H> Decorator<H> for RequestLogDecorator {
    type Out = RequestLog<H>;

    fn decorate(&self, raw: H) -> Self::Out {
        RequestLog { inner: raw }
    }
}

/// Emits one `info` event per request with its outcome and handling time.
#[derive(Debug)]
pub struct RequestLog<H> {
    inner: H,
}

impl<S, H: Handler<S>> Handler<S> for RequestLog<H> {
    fn start(&self, request: &HttpRequest, response: &mut dyn HttpResponse, session: &mut S) -> Result<Next, HandlerError> {
        let started = Instant::now();
        let result = self.inner.start(request, response, session);

        let outcome = match &result {
            Ok(Next::ReadRequest) => "keep-alive",
            Ok(Next::Close) => "close",
            Ok(Next::Upgrade(_)) => "upgrade",
            Err(_) => "failed",
        };
        info!(
            method = %request.method(),
            uri = %request.request_uri(),
            remote_addr = %request.remote_addr(),
            outcome,
            elapsed = ?started.elapsed(),
            "request handled"
        );
        result
    }
}
