//! A reactor-per-thread HTTP/1.1 and WebSocket server core
//!
//! This crate multiplexes many connections over a small, fixed pool of single-threaded
//! event loops. Every connection belongs to exactly one [`reactor::Reactor`] for its whole
//! life, so per-connection state needs no locks: the only cross-thread step is handing a
//! freshly accepted socket to a worker's task queue.
//!
//! # Features
//!
//! - Incremental HTTP/1.1 parsing across arbitrary read boundaries, keep-alive
//! - `Content-Length` delimited bodies (chunked transfer encoding is rejected)
//! - Non-blocking writes with an ordered outbound queue and backpressure reporting
//! - WebSocket upgrade, framing, fragmentation and control frames on the same connection
//! - Bounded read loops per wake-up for fairness between connections
//! - Exactly-once session teardown
//!
//! # Example
//!
//! ```no_run
//! use std::net::TcpListener;
//! use std::sync::Arc;
//!
//! use http::StatusCode;
//! use nio_http::codec::{HttpResponse, HttpResponseExt};
//! use nio_http::connection::{ConnectionConfig, WebDispatcher};
//! use nio_http::handler::{Handler, NoSession, handler_fn};
//! use nio_http::protocol::{Charset, HttpRequest};
//! use nio_http::reactor::Reactor;
//!
//! let worker = Reactor::new("worker-0");
//! worker.start().expect("start worker");
//!
//! let handler: Arc<dyn Handler<()>> = Arc::new(handler_fn(|request: &HttpRequest, response: &mut dyn HttpResponse, _: &mut ()| {
//!     response.send_text(StatusCode::OK, &mime::TEXT_PLAIN, request.path(), Charset::Utf8);
//!     Ok(())
//! }));
//! let dispatcher = Arc::new(WebDispatcher::new(worker, handler, Arc::new(NoSession), Arc::new(ConnectionConfig::default())));
//!
//! let listener = TcpListener::bind("127.0.0.1:8080").expect("bind");
//! for stream in listener.incoming().flatten() {
//!     if let Ok(remote_addr) = stream.peer_addr() {
//!         dispatcher.dispatch(stream, remote_addr);
//!     }
//! }
//! ```
//!
//! The `nio-web` crate wires this up with an acceptor reactor, round-robin distribution
//! and path routing.
//!
//! # Architecture
//!
//! - [`reactor`]: event loops, their task queues and the group that disposes them
//! - [`connection`]: the per-connection state machine, dispatcher and write queue
//! - [`protocol`]: requests, headers, charsets, [`SendResult`](protocol::SendResult), errors
//! - [`codec`]: request decoding and response framing
//! - [`handler`]: request handler and session factory traits
//! - [`websocket`]: handshake, frame codec and WebSocket callbacks
//!
//! # Error Handling
//!
//! - [`protocol::HttpError`]: Top-level error type
//! - [`protocol::ParseError`]: Request parsing errors, answered with `400` and a close
//! - [`protocol::SendError`]: Response sending errors
//! - [`websocket::WsError`]: Frame level violations, answered with a close frame
//!
//! Handler errors and panics close the affected connection only; the reactor keeps
//! serving its other connections.
//!
//! # Limitations
//!
//! - HTTP/1.1 only, no TLS
//! - Maximum header size: 8KB
//! - Maximum number of headers: 64
//! - No WebSocket extensions

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;
pub mod reactor;
pub mod websocket;

mod utils;
pub(crate) use utils::ensure;
