use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use nio_http::connection::{ConnectionConfig, WebDispatcher};
use nio_http::handler::{Handler, SessionFactory};
use nio_http::protocol::Charset;
use nio_http::reactor::Reactor;
use nio_http::websocket::{WebSocketHandler, WebSocketRequestHandler};

use crate::decorator::{Decorator, DecoratorComposer, DecoratorExt, IdentityDecorator};
use crate::router::{Router, RouterBuilder};

type RouteFn<S> = Box<dyn FnOnce(RouterBuilder<S>, Charset) -> RouterBuilder<S>>;

/// Collects routes, the session factory, a decorator and connection tunables.
///
/// WebSocket routes pick up the charset configured at [`build`](Self::build) time, so
/// [`websocket_charset`](Self::websocket_charset) may be set before or after them.
pub struct WebServerConfigBuilder<F: SessionFactory, D = IdentityDecorator> {
    factory: Arc<F>,
    routes: Vec<RouteFn<F::Session>>,
    default_handler: Option<Arc<dyn Handler<F::Session>>>,
    decorator: D,
    connection: ConnectionConfig,
}

impl<F: SessionFactory> WebServerConfigBuilder<F> {
    pub fn new(factory: F) -> Self {
        Self::with_shared_factory(Arc::new(factory))
    }

    pub fn with_shared_factory(factory: Arc<F>) -> Self {
        Self {
            factory,
            routes: Vec::new(),
            default_handler: None,
            decorator: IdentityDecorator,
            connection: ConnectionConfig::default(),
        }
    }
}

impl<F: SessionFactory, D> WebServerConfigBuilder<F, D> {
    /// Routes requests for exactly `path` to `handler`.
    pub fn add(mut self, path: impl Into<String>, handler: impl Handler<F::Session> + 'static) -> Self {
        let path = path.into();
        self.routes.push(Box::new(move |router, _| router.route(path, handler)));
        self
    }

    /// Serves WebSocket upgrades on exactly `path` with `handler`.
    pub fn add_websocket<H>(mut self, path: impl Into<String>, handler: H) -> Self
    where
        H: WebSocketHandler<F::Session>,
    {
        let path = path.into();
        self.routes.push(Box::new(move |router, charset| router.route(path, WebSocketRequestHandler::new(handler, charset))));
        self
    }

    /// Replaces the `404` reply for paths without a route.
    pub fn default_handler(mut self, handler: impl Handler<F::Session> + 'static) -> Self {
        self.default_handler = Some(Arc::new(handler));
        self
    }

    /// Adds `decorator` around whatever the current decorators produce.
    pub fn with_decorator<D2>(self, decorator: D2) -> WebServerConfigBuilder<F, DecoratorComposer<D, D2>>
    where
        D: Decorator<Arc<dyn Handler<F::Session>>>,
        D2: Decorator<D::Out>,
    {
        WebServerConfigBuilder {
            factory: self.factory,
            routes: self.routes,
            default_handler: self.default_handler,
            decorator: self.decorator.and_then(decorator),
            connection: self.connection,
        }
    }

    pub fn websocket_charset(mut self, charset: Charset) -> Self {
        self.connection.websocket_charset = charset;
        self
    }

    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.connection.read_buffer_size = size.max(1);
        self
    }

    pub fn max_read_loops(mut self, loops: usize) -> Self {
        self.connection.max_read_loops = loops.max(1);
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.connection.read_timeout = Some(timeout);
        self
    }

    /// Longest a closing connection waits for its queued output; a shorter read timeout wins.
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.connection.close_timeout = timeout;
        self
    }

    pub fn max_body_size(mut self, size: usize) -> Self {
        self.connection.max_body_size = size;
        self
    }

    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.connection.max_frame_size = size;
        self
    }

    /// Builds the router and applies the decorators to it, once.
    pub fn build(self) -> WebServerConfig<F>
    where
        D: Decorator<Arc<dyn Handler<F::Session>>>,
        D::Out: Handler<F::Session> + 'static,
    {
        let charset = self.connection.websocket_charset;
        let mut router = Router::builder();
        for route in self.routes {
            router = route(router, charset);
        }
        if let Some(default_handler) = self.default_handler {
            router = router.default_handler(default_handler);
        }

        let routed: Arc<dyn Handler<F::Session>> = Arc::new(router.build());
        let handler: Arc<dyn Handler<F::Session>> = Arc::new(self.decorator.decorate(routed));
        WebServerConfig { handler, factory: self.factory, connection: Arc::new(self.connection) }
    }
}

impl<F: SessionFactory, D: fmt::Debug> fmt::Debug for WebServerConfigBuilder<F, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebServerConfigBuilder")
            .field("routes", &self.routes.len())
            .field("decorator", &self.decorator)
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}

/// A built, immutable server configuration, shared by every worker reactor.
pub struct WebServerConfig<F: SessionFactory> {
    handler: Arc<dyn Handler<F::Session>>,
    factory: Arc<F>,
    connection: Arc<ConnectionConfig>,
}

impl<F: SessionFactory> WebServerConfig<F> {
    /// A dispatcher registering connections on `reactor` with this configuration.
    pub fn create(&self, reactor: Reactor) -> Arc<WebDispatcher<F>> {
        Arc::new(WebDispatcher::new(
            reactor,
            Arc::clone(&self.handler),
            Arc::clone(&self.factory),
            Arc::clone(&self.connection),
        ))
    }

    pub fn handler(&self) -> &Arc<dyn Handler<F::Session>> {
        &self.handler
    }

    pub fn connection_config(&self) -> &ConnectionConfig {
        &self.connection
    }
}

impl<F: SessionFactory> Clone for WebServerConfig<F> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            factory: Arc::clone(&self.factory),
            connection: Arc::clone(&self.connection),
        }
    }
}

impl<F: SessionFactory> fmt::Debug for WebServerConfig<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebServerConfig").field("connection", &self.connection).finish_non_exhaustive()
    }
}
