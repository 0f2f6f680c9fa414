//! Exact-path request routing.
//!
//! A [`Router`] is built once, before any reactor starts, and never changes afterwards.
//! It is shared by every worker reactor through an `Arc`, so lookups take `&self` only.
//! There is no wildcard or prefix matching: the request path (without query) must equal
//! a registered path, otherwise the default handler runs.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use nio_http::codec::{HttpResponse, HttpResponseExt};
use nio_http::handler::{Handler, Next};
use nio_http::protocol::{Charset, HandlerError, HttpRequest};
use tracing::{trace, warn};

/// Immutable mapping from exact path to handler.
pub struct Router<S> {
    routes: HashMap<String, Arc<dyn Handler<S>>>,
    default_handler: Arc<dyn Handler<S>>,
}

impl<S: 'static> Router<S> {
    /// Creates a new router builder with the [`NotFound`] default handler
    pub fn builder() -> RouterBuilder<S> {
        RouterBuilder::new()
    }
}

impl<S> Router<S> {
    /// Returns the handler registered for `path`, or the default handler.
    pub fn at(&self, path: &str) -> &dyn Handler<S> {
        match self.routes.get(path) {
            Some(handler) => handler.as_ref(),
            None => self.default_handler.as_ref(),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.routes.contains_key(path)
    }

    /// Registered paths, in no particular order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<S> Handler<S> for Router<S> {
    fn start(&self, request: &HttpRequest, response: &mut dyn HttpResponse, session: &mut S) -> Result<Next, HandlerError> {
        let path = request.path();
        trace!(path, matched = self.contains(path), "routing request");
        self.at(path).start(request, response, session)
    }
}

impl<S> fmt::Debug for Router<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("paths", &self.routes.keys().collect::<Vec<_>>()).finish_non_exhaustive()
    }
}

pub struct RouterBuilder<S> {
    routes: HashMap<String, Arc<dyn Handler<S>>>,
    default_handler: Option<Arc<dyn Handler<S>>>,
}

impl<S: 'static> RouterBuilder<S> {
    fn new() -> Self {
        Self { routes: HashMap::new(), default_handler: None }
    }

    /// Registers `handler` for requests whose path is exactly `path`.
    ///
    /// Registering the same path twice keeps the later handler.
    pub fn route(self, path: impl Into<String>, handler: impl Handler<S> + 'static) -> Self {
        self.route_arc(path, Arc::new(handler))
    }

    pub fn route_arc(mut self, path: impl Into<String>, handler: Arc<dyn Handler<S>>) -> Self {
        let path = path.into();
        if self.routes.insert(path.clone(), handler).is_some() {
            warn!(path, "route registered twice, the later handler wins");
        }
        self
    }

    /// Handler for paths without a route; [`NotFound`] when unset.
    pub fn default_handler(mut self, handler: impl Handler<S> + 'static) -> Self {
        self.default_handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Router<S> {
        let default_handler = self.default_handler.unwrap_or_else(|| Arc::new(NotFound));
        Router { routes: self.routes, default_handler }
    }
}

impl<S> fmt::Debug for RouterBuilder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder").field("paths", &self.routes.keys().collect::<Vec<_>>()).finish_non_exhaustive()
    }
}

/// Answers `404 Not Found` with the request URI in a US-ASCII text body.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotFound;

impl<S> Handler<S> for NotFound {
    fn start(&self, request: &HttpRequest, response: &mut dyn HttpResponse, _session: &mut S) -> Result<Next, HandlerError> {
        let body = format!("{} Not Found", request.request_uri());
        response.send_text(StatusCode::NOT_FOUND, &mime::TEXT_PLAIN, &body, Charset::UsAscii);
        Ok(Next::ReadRequest)
    }
}
