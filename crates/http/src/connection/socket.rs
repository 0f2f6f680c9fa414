use std::io;

use tokio::net::TcpStream;

/// The non-blocking operations a connection needs from its transport.
///
/// `try_*` never wait: they fail with [`io::ErrorKind::WouldBlock`] when the socket is not
/// ready. The readiness futures resolve once a retry may make progress.
pub trait Socket {
    fn try_read(&self, buf: &mut [u8]) -> io::Result<usize>;

    fn try_write(&self, buf: &[u8]) -> io::Result<usize>;

    fn readable(&self) -> impl Future<Output = io::Result<()>>;

    fn writable(&self) -> impl Future<Output = io::Result<()>>;
}

impl Socket for TcpStream {
    fn try_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        TcpStream::try_read(self, buf)
    }

    fn try_write(&self, buf: &[u8]) -> io::Result<usize> {
        TcpStream::try_write(self, buf)
    }

    fn readable(&self) -> impl Future<Output = io::Result<()>> {
        TcpStream::readable(self)
    }

    fn writable(&self) -> impl Future<Output = io::Result<()>> {
        TcpStream::writable(self)
    }
}
