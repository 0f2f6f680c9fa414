use std::io;

use http::Method;
use thiserror::Error;

use crate::protocol::CharsetError;
use crate::websocket::close_code;

#[derive(Error, Debug)]
pub enum WsError {
    #[error("invalid opcode: 0x{0:X}")]
    InvalidOpcode(u8),

    #[error("reserved bits set without extension")]
    ReservedBitsSet,

    #[error("client frame must be masked")]
    UnmaskedClientFrame,

    #[error("server frame must not be masked")]
    MaskedServerFrame,

    #[error("control frame payload too large: {0} bytes (max: 125)")]
    ControlFrameTooLarge(u64),

    #[error("control frame cannot be fragmented")]
    FragmentedControlFrame,

    #[error("payload too large: {size} bytes (max: {max})")]
    PayloadTooLarge { size: u64, max: usize },

    #[error("continuation frame without a message in progress")]
    UnexpectedContinuation,

    #[error("new data frame while a fragmented message is in progress")]
    InterleavedDataFrame,

    #[error("invalid text payload: {source}")]
    InvalidText {
        #[from]
        source: CharsetError,
    },

    #[error("invalid close frame payload")]
    InvalidClosePayload,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl WsError {
    /// The status code sent in the close frame when this error ends a connection.
    pub fn close_code(&self) -> u16 {
        match self {
            WsError::PayloadTooLarge { .. } => close_code::MESSAGE_TOO_BIG,
            WsError::InvalidText { .. } => close_code::INVALID_PAYLOAD,
            WsError::Io { .. } => close_code::INTERNAL_ERROR,
            _ => close_code::PROTOCOL_ERROR,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("websocket upgrade requires GET, got {0}")]
    InvalidMethod(Method),

    #[error("missing header: {0}")]
    MissingHeader(&'static str),

    #[error("upgrade header doesn't contain websocket")]
    InvalidUpgrade,

    #[error("connection header doesn't contain upgrade")]
    InvalidConnection,

    #[error("invalid sec-websocket-key")]
    InvalidKey,

    #[error("unsupported websocket version: {0}")]
    UnsupportedVersion(String),
}
