use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::debug;

/// Opens blocking client connections with a fixed set of socket options.
///
/// This is for client code outside the reactors: the returned stream is in blocking
/// mode, with the configured read timeout.
#[derive(Debug, Clone)]
pub struct SocketConnector {
    host: String,
    port: u16,
    tcp_no_delay: bool,
    read_timeout: Option<Duration>,
    connect_timeout: Duration,
    receive_buffer_size: Option<usize>,
    send_buffer_size: Option<usize>,
}

impl SocketConnector {
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(3000);
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(4000);

    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tcp_no_delay: true,
            read_timeout: Some(Self::DEFAULT_READ_TIMEOUT),
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            receive_buffer_size: None,
            send_buffer_size: None,
        }
    }

    #[must_use]
    pub fn tcp_no_delay(mut self, tcp_no_delay: bool) -> Self {
        self.tcp_no_delay = tcp_no_delay;
        self
    }

    /// `None` lets reads block forever.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn receive_buffer_size(mut self, size: usize) -> Self {
        self.receive_buffer_size = Some(size);
        self
    }

    #[must_use]
    pub fn send_buffer_size(mut self, size: usize) -> Self {
        self.send_buffer_size = Some(size);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Connects to the first resolved address that answers within the connect timeout.
    pub fn connect(&self) -> io::Result<TcpStream> {
        let mut last_err = None;
        for addr in (self.host.as_str(), self.port).to_socket_addrs()? {
            let socket = self.configure_socket(Domain::for_address(addr))?;
            match socket.connect_timeout(&addr.into(), self.connect_timeout) {
                Ok(()) => return Ok(socket.into()),
                Err(e) => {
                    debug!(%addr, cause = %e, "connect failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no socket addresses found")))
    }

    /// A fresh, unconnected TCP socket with the configured options applied.
    pub fn configure_socket(&self, domain: Domain) -> io::Result<Socket> {
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
        socket.set_nodelay(self.tcp_no_delay)?;
        socket.set_read_timeout(self.read_timeout)?;
        if let Some(size) = self.receive_buffer_size {
            socket.set_recv_buffer_size(size)?;
        }
        if let Some(size) = self.send_buffer_size {
            socket.set_send_buffer_size(size)?;
        }
        Ok(socket)
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;

    #[test]
    fn connect_applies_options() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let connector = SocketConnector::new("127.0.0.1", listener.local_addr().unwrap().port())
            .read_timeout(Some(Duration::from_millis(1500)));

        let stream = connector.connect().unwrap();

        assert!(stream.nodelay().unwrap());
        assert_eq!(stream.read_timeout().unwrap(), Some(Duration::from_millis(1500)));
        assert_eq!(stream.peer_addr().unwrap(), listener.local_addr().unwrap());
    }

    #[test]
    fn defaults() {
        let connector = SocketConnector::new("localhost", 8025);
        let socket = connector.configure_socket(Domain::IPV4).unwrap();

        assert!(socket.nodelay().unwrap());
        assert_eq!(socket.read_timeout().unwrap(), Some(SocketConnector::DEFAULT_READ_TIMEOUT));
        assert_eq!(connector.host(), "localhost");
    }

    #[test]
    fn refused_connection_is_an_error() {
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        assert!(SocketConnector::new("127.0.0.1", port).connect().is_err());
    }
}
