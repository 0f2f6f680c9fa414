//! Connection handling module
//!
//! Everything that happens to an accepted socket on its worker reactor.
//!
//! # Components
//!
//! - [`WebDispatcher`]: moves accepted sockets onto a worker reactor and registers them
//! - [`HttpConnection`]: the per-connection state machine:
//!   - bounded read loops per readiness event
//!   - keep-alive request parsing and dispatch
//!   - the switch to WebSocket framing after an upgrade
//!   - exactly-once teardown of session state
//! - [`MessageWriter`]: the outbound FIFO queue behind [`SendResult`](crate::protocol::SendResult)
//! - [`Socket`]: the non-blocking transport operations a connection relies on

mod config;
mod dispatcher;
mod http_connection;
mod message_writer;
mod socket;

pub use config::ConnectionConfig;
pub use dispatcher::WebDispatcher;
pub use http_connection::{HttpConnection, ReadOutcome, Stage};
pub use message_writer::MessageWriter;
pub use socket::Socket;
