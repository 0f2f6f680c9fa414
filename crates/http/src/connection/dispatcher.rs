use std::io;
use std::net::{SocketAddr, TcpStream as StdTcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::connection::{ConnectionConfig, HttpConnection};
use crate::handler::{ConnectionInfo, Handler, SessionFactory};
use crate::reactor::{Reactor, ReactorContext};

/// Registers accepted sockets on one worker reactor.
///
/// [`dispatch`](WebDispatcher::dispatch) is the hand-off point between threads: it is
/// called on the acceptor thread, moves the socket into a task and queues that task on
/// the worker. From then on only the worker touches the connection.
pub struct WebDispatcher<F: SessionFactory> {
    reactor: Reactor,
    handler: Arc<dyn Handler<F::Session>>,
    factory: Arc<F>,
    config: Arc<ConnectionConfig>,
    next_id: AtomicU64,
}

impl<F: SessionFactory> WebDispatcher<F> {
    pub fn new(reactor: Reactor, handler: Arc<dyn Handler<F::Session>>, factory: Arc<F>, config: Arc<ConnectionConfig>) -> Self {
        Self { reactor, handler, factory, config, next_id: AtomicU64::new(0) }
    }

    pub fn reactor(&self) -> &Reactor {
        &self.reactor
    }

    /// Queues `stream` for registration on the worker; `false` if the worker is gone.
    pub fn dispatch(self: &Arc<Self>, stream: StdTcpStream, remote_addr: SocketAddr) -> bool {
        let dispatcher = Arc::clone(self);
        let scheduled = self.reactor.schedule(move |ctx| {
            if let Err(e) = dispatcher.register(ctx, stream, remote_addr) {
                warn!(reactor = ctx.name(), %remote_addr, cause = %e, "can't register connection");
            }
        });
        if !scheduled {
            warn!(reactor = self.reactor.name(), %remote_addr, "worker reactor is disposed, dropping connection");
        }
        scheduled
    }

    fn register(&self, ctx: &ReactorContext, stream: StdTcpStream, remote_addr: SocketAddr) -> io::Result<()> {
        stream.set_nonblocking(true)?;
        let stream = TcpStream::from_std(stream)?;

        let info = ConnectionInfo { id: self.next_id.fetch_add(1, Ordering::Relaxed), remote_addr, reactor: ctx.name_arc() };
        debug!(reactor = ctx.name(), id = info.id, %remote_addr, "registering connection");

        let connection = HttpConnection::new(
            stream,
            &info,
            Arc::clone(&self.handler),
            Arc::clone(&self.factory),
            Arc::clone(&self.config),
        );
        ctx.spawn(connection.process(ctx.shutdown_token()));
        Ok(())
    }
}

impl<F: SessionFactory> std::fmt::Debug for WebDispatcher<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDispatcher").field("reactor", &self.reactor).field("config", &self.config).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::Mutex;
    use std::time::Duration;

    use http::StatusCode;

    use super::*;
    use crate::codec::{HttpResponse, HttpResponseExt};
    use crate::handler::handler_fn;
    use crate::protocol::{Charset, HttpRequest};

    #[derive(Debug, Default)]
    struct Sessions {
        created: Mutex<Vec<String>>,
        closed: Mutex<usize>,
    }

    impl SessionFactory for Sessions {
        type Session = ();

        fn create(&self, info: &ConnectionInfo) {
            self.created.lock().unwrap().push(info.reactor.to_string());
        }

        fn on_close(&self, (): ()) {
            *self.closed.lock().unwrap() += 1;
        }
    }

    #[test]
    fn serves_and_closes_on_dispose() {
        let reactor = Reactor::new("dispatch-worker");
        reactor.start().unwrap();

        let handler: Arc<dyn Handler<()>> = Arc::new(handler_fn(|request: &HttpRequest, response: &mut dyn HttpResponse, _: &mut ()| {
            response.send_text(StatusCode::OK, &mime::TEXT_PLAIN, request.path(), Charset::Utf8);
            Ok(())
        }));
        let sessions = Arc::new(Sessions::default());
        let dispatcher = Arc::new(WebDispatcher::new(reactor.clone(), handler, Arc::clone(&sessions), Arc::default()));

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = std::net::TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server_side, remote_addr) = listener.accept().unwrap();
        assert!(dispatcher.dispatch(server_side, remote_addr));

        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        client.write_all(b"GET /ping HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        let mut buf = [0u8; 256];
        let n = client.read(&mut buf).unwrap();
        let reply = std::str::from_utf8(&buf[..n]).unwrap();
        assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(reply.ends_with("/ping"));

        reactor.dispose();
        assert_eq!(*sessions.created.lock().unwrap(), vec!["dispatch-worker"]);
        assert_eq!(*sessions.closed.lock().unwrap(), 1);

        let late = std::net::TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        assert!(!dispatcher.dispatch(late, remote_addr));
    }
}
