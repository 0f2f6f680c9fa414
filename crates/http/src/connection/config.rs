use std::time::Duration;

use crate::codec::DEFAULT_MAX_BODY_SIZE;
use crate::protocol::Charset;
use crate::websocket::FrameCodec;

/// Per-connection tunables, shared by every connection of a server.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Size of the scratch buffer filled by one read.
    pub read_buffer_size: usize,
    /// Reads performed per readiness event before yielding to other connections.
    pub max_read_loops: usize,
    /// Close a connection that stays idle this long; `None` waits forever.
    pub read_timeout: Option<Duration>,
    /// Longest a closing connection waits for its queued output to drain.
    ///
    /// A shorter `read_timeout` takes precedence.
    pub close_timeout: Duration,
    pub max_body_size: usize,
    /// Largest WebSocket message accepted, before or after reassembly.
    pub max_frame_size: usize,
    pub websocket_charset: Charset,
}

impl ConnectionConfig {
    pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;
    pub const DEFAULT_MAX_READ_LOOPS: usize = 50;
    pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

    /// How long a connection may stay in the closing stage.
    pub fn close_deadline(&self) -> Duration {
        self.read_timeout.map_or(self.close_timeout, |timeout| timeout.min(self.close_timeout))
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: Self::DEFAULT_READ_BUFFER_SIZE,
            max_read_loops: Self::DEFAULT_MAX_READ_LOOPS,
            read_timeout: None,
            close_timeout: Self::DEFAULT_CLOSE_TIMEOUT,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            max_frame_size: FrameCodec::DEFAULT_MAX_PAYLOAD_SIZE,
            websocket_charset: Charset::Utf8,
        }
    }
}
