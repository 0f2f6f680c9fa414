//! Accepting connections and spreading them over the worker reactors.

use std::fmt;
use std::io;
use std::net::{SocketAddr, TcpListener as StdTcpListener, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use nio_http::connection::WebDispatcher;
use nio_http::handler::SessionFactory;
use nio_http::reactor::Reactor;
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tokio::net::{TcpListener, TcpStream};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Pause after a failed accept, e.g. when the process ran out of file descriptors.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Socket options for the listener and every accepted connection.
#[derive(Debug, Clone)]
pub struct AcceptorConfig {
    pub tcp_no_delay: bool,
    /// `None` keeps the OS default.
    pub send_buffer_size: Option<usize>,
    /// `None` keeps the OS default.
    pub receive_buffer_size: Option<usize>,
    pub backlog: i32,
}

impl Default for AcceptorConfig {
    fn default() -> Self {
        Self { tcp_no_delay: true, send_buffer_size: None, receive_buffer_size: None, backlog: 1024 }
    }
}

/// Hands out targets in a fixed cyclic order: the i-th call returns target `i mod N`.
#[derive(Debug, Clone)]
pub struct RoundRobin<T> {
    targets: Vec<T>,
    next: usize,
}

impl<T> RoundRobin<T> {
    /// `None` when `targets` is empty.
    pub fn new(targets: Vec<T>) -> Option<Self> {
        if targets.is_empty() {
            return None;
        }
        Some(Self { targets, next: 0 })
    }

    pub fn assign(&mut self) -> &T {
        let index = self.next;
        self.next = (index + 1) % self.targets.len();
        &self.targets[index]
    }

    pub fn targets(&self) -> &[T] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Runs the acceptor's end callback when dropped.
///
/// Owned by the acceptor, so the callback fires whether the accept loop ran to
/// completion or was discarded before it was ever polled.
struct OnEnd(Option<Box<dyn FnOnce() + Send>>);

impl Drop for OnEnd {
    fn drop(&mut self) {
        if let Some(on_end) = self.0.take() {
            on_end();
        }
    }
}

/// Listens on a dedicated reactor and passes each accepted socket to the next worker.
///
/// The accept loop is the only owner of the round-robin counter. After
/// [`WebDispatcher::dispatch`] the socket belongs to the worker; the acceptor never
/// touches it again. Accept errors are logged and the loop keeps going.
pub struct WebAcceptor<F: SessionFactory> {
    listener: StdTcpListener,
    local_addr: SocketAddr,
    distributor: RoundRobin<Arc<WebDispatcher<F>>>,
    config: AcceptorConfig,
    on_end: OnEnd,
}

impl<F: SessionFactory> WebAcceptor<F> {
    /// Binds the first address that accepts a listener.
    pub fn bind(addr: impl ToSocketAddrs, config: AcceptorConfig, dispatchers: Vec<Arc<WebDispatcher<F>>>) -> io::Result<Self> {
        let distributor = RoundRobin::new(dispatchers)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "acceptor needs at least one worker"))?;

        let mut last_err = None;
        for addr in addr.to_socket_addrs()? {
            match bind_listener(addr, config.backlog) {
                Ok(listener) => {
                    let local_addr = listener.local_addr()?;
                    return Ok(Self { listener, local_addr, distributor, config, on_end: OnEnd(None) });
                }
                Err(e) => {
                    debug!(%addr, cause = %e, "can't bind");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no socket addresses found")))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs `on_end` once the accept loop stopped.
    ///
    /// An acceptor dropped without running, e.g. because its reactor was disposed
    /// first, still runs `on_end` exactly once.
    #[must_use]
    pub fn on_end(mut self, on_end: impl FnOnce() + Send + 'static) -> Self {
        self.on_end = OnEnd(Some(Box::new(on_end)));
        self
    }

    /// Queues the accept loop on `reactor`; `false` if the reactor is already disposed.
    pub fn start(self, reactor: &Reactor) -> bool {
        reactor.schedule(move |ctx| ctx.spawn(self.run(ctx.shutdown_token())))
    }

    async fn run(self, shutdown: CancellationToken) {
        // the end callback fires when `_on_end` drops, after the loop below
        let Self { listener, local_addr, mut distributor, config, on_end: _on_end } = self;

        match TcpListener::from_std(listener) {
            Ok(listener) => {
                info!(%local_addr, workers = distributor.len(), "acceptor listening");
                accept_loop(&listener, &mut distributor, &config, &shutdown).await;
                info!(%local_addr, "acceptor stopped");
            }
            Err(e) => error!(%local_addr, cause = %e, "can't register listener"),
        }
    }
}

async fn accept_loop<F: SessionFactory>(
    listener: &TcpListener,
    distributor: &mut RoundRobin<Arc<WebDispatcher<F>>>,
    config: &AcceptorConfig,
    shutdown: &CancellationToken,
) {
    loop {
        let accepted = select! {
            biased;
            () = shutdown.cancelled() => return,
            accepted = listener.accept() => accepted,
        };

        let (stream, remote_addr) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(cause = %e, "failed to accept");
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                continue;
            }
        };

        if let Err(e) = configure(&stream, config) {
            warn!(%remote_addr, cause = %e, "can't apply socket options");
        }
        match stream.into_std() {
            Ok(stream) => {
                distributor.assign().dispatch(stream, remote_addr);
            }
            Err(e) => warn!(%remote_addr, cause = %e, "can't detach accepted socket"),
        }
    }
}

fn bind_listener(addr: SocketAddr, backlog: i32) -> io::Result<StdTcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}

fn configure(stream: &TcpStream, config: &AcceptorConfig) -> io::Result<()> {
    stream.set_nodelay(config.tcp_no_delay)?;
    let socket = SockRef::from(stream);
    if let Some(size) = config.send_buffer_size {
        socket.set_send_buffer_size(size)?;
    }
    if let Some(size) = config.receive_buffer_size {
        socket.set_recv_buffer_size(size)?;
    }
    Ok(())
}

impl<F: SessionFactory> fmt::Debug for WebAcceptor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebAcceptor")
            .field("local_addr", &self.local_addr)
            .field("workers", &self.distributor.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
