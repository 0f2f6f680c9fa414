//! WebSocket support layered on an HTTP connection.
//!
//! - [`handshake`]: upgrade validation and the `Sec-WebSocket-Accept` computation
//! - [`FrameCodec`]: frame encoding and decoding
//! - [`MessageAssembler`]: reassembly of fragmented messages
//! - [`WebSocketHandler`]: application callbacks, attached to a route through
//!   [`WebSocketRequestHandler`]
//! - [`WebSocketStream`]: the read side that replaces the HTTP parser after the upgrade

mod assembler;
mod connection;
mod error;
mod frame;
pub mod handshake;
mod handler;
mod stream;

pub use assembler::{Message, MessageAssembler};
pub use connection::WebSocketConnection;
pub use error::{HandshakeError, WsError};
pub use frame::{Frame, FrameCodec, MAX_CONTROL_PAYLOAD, Opcode, Role, apply_mask};
pub use handler::{WebSocketHandler, WebSocketRequestHandler, WebSocketSession};
pub use handshake::compute_accept_key;
pub use stream::{Flow, WebSocketStream};

/// Status codes carried by close frames.
pub mod close_code {
    pub const NORMAL: u16 = 1000;
    pub const GOING_AWAY: u16 = 1001;
    pub const PROTOCOL_ERROR: u16 = 1002;
    pub const INVALID_PAYLOAD: u16 = 1007;
    pub const MESSAGE_TOO_BIG: u16 = 1009;
    pub const INTERNAL_ERROR: u16 = 1011;

    /// Whether `code` may be carried by a close frame.
    pub fn is_valid(code: u16) -> bool {
        matches!(code, 1000..=1003 | 1007..=1011 | 3000..=4999)
    }
}
