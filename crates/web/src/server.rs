use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::num::NonZeroUsize;
use std::thread;

use nio_http::handler::SessionFactory;
use nio_http::reactor::ReactorGroup;
use thiserror::Error;
use tracing::info;

use crate::acceptor::{AcceptorConfig, WebAcceptor};
use crate::config::WebServerConfig;

pub struct ServerBuilder<F: SessionFactory> {
    config: WebServerConfig<F>,
    address: Option<io::Result<Vec<SocketAddr>>>,
    workers: Option<usize>,
    acceptor: AcceptorConfig,
    on_acceptor_end: Option<Box<dyn FnOnce() + Send>>,
}

impl<F: SessionFactory> ServerBuilder<F> {
    fn new(config: WebServerConfig<F>) -> Self {
        Self { config, address: None, workers: None, acceptor: AcceptorConfig::default(), on_acceptor_end: None }
    }

    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = Some(address.to_socket_addrs().map(Iterator::collect));
        self
    }

    /// Worker reactor count; defaults to the available parallelism.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn acceptor_config(mut self, acceptor: AcceptorConfig) -> Self {
        self.acceptor = acceptor;
        self
    }

    /// Runs `on_end` on the acceptor thread once it stops accepting.
    pub fn on_acceptor_end(mut self, on_end: impl FnOnce() + Send + 'static) -> Self {
        self.on_acceptor_end = Some(Box::new(on_end));
        self
    }

    pub fn build(self) -> Result<WebServer<F>, ServerBuildError> {
        let address = self.address.ok_or(ServerBuildError::MissingAddress)?.map_err(ServerBuildError::InvalidAddress)?;
        if address.is_empty() {
            return Err(ServerBuildError::MissingAddress);
        }

        let workers = match self.workers {
            Some(0) => return Err(ServerBuildError::NoWorkers),
            Some(workers) => workers,
            None => thread::available_parallelism().map_or(1, NonZeroUsize::get),
        };

        Ok(WebServer {
            config: self.config,
            address,
            workers,
            acceptor: self.acceptor,
            on_acceptor_end: self.on_acceptor_end,
        })
    }
}

impl<F: SessionFactory> fmt::Debug for ServerBuilder<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("config", &self.config)
            .field("workers", &self.workers)
            .field("acceptor", &self.acceptor)
            .finish_non_exhaustive()
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("address must be set")]
    MissingAddress,
    #[error("invalid address: {0}")]
    InvalidAddress(#[source] io::Error),
    #[error("at least one worker reactor is required")]
    NoWorkers,
}

/// One acceptor reactor feeding `workers` worker reactors.
pub struct WebServer<F: SessionFactory> {
    config: WebServerConfig<F>,
    address: Vec<SocketAddr>,
    workers: usize,
    acceptor: AcceptorConfig,
    on_acceptor_end: Option<Box<dyn FnOnce() + Send>>,
}

impl<F: SessionFactory> WebServer<F> {
    pub fn builder(config: WebServerConfig<F>) -> ServerBuilder<F> {
        ServerBuilder::new(config)
    }

    /// Binds the listener and starts every reactor.
    ///
    /// Returns once the server is accepting; it runs until the handle is disposed or dropped.
    pub fn start(self) -> io::Result<ServerHandle> {
        let group = ReactorGroup::with_workers(self.workers);
        let dispatchers: Vec<_> = group.workers().iter().map(|worker| self.config.create(worker.clone())).collect();

        let mut acceptor = WebAcceptor::bind(self.address.as_slice(), self.acceptor, dispatchers)?;
        if let Some(on_end) = self.on_acceptor_end {
            acceptor = acceptor.on_end(on_end);
        }
        let local_addr = acceptor.local_addr();

        acceptor.start(group.acceptor());
        group.start_all()?;
        info!(%local_addr, workers = self.workers, "server started");
        Ok(ServerHandle { group, local_addr })
    }
}

impl<F: SessionFactory> fmt::Debug for WebServer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebServer")
            .field("address", &self.address)
            .field("workers", &self.workers)
            .field("acceptor", &self.acceptor)
            .finish_non_exhaustive()
    }
}

/// A running server. Disposing or dropping it stops the acceptor, then every worker.
#[derive(Debug)]
pub struct ServerHandle {
    group: ReactorGroup,
    local_addr: SocketAddr,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn reactors(&self) -> &ReactorGroup {
        &self.group
    }

    /// Closes every connection and waits for the reactor threads to exit.
    pub fn dispose(&self) {
        self.group.dispose();
    }
}
