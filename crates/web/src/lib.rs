//! Server assembly on top of `nio-http`
//!
//! This crate turns the reactor core into a runnable server: one acceptor reactor
//! hands accepted sockets round-robin to N worker reactors, and every worker serves its
//! connections through one shared, immutable routed handler.
//!
//! # Example
//!
//! ```no_run
//! use http::StatusCode;
//! use nio_http::codec::{HttpResponse, HttpResponseExt};
//! use nio_http::handler::{NoSession, handler_fn};
//! use nio_http::protocol::{Charset, HttpRequest};
//! use nio_web::WebServer;
//! use nio_web::config::WebServerConfigBuilder;
//! use nio_web::decorator::RequestLogDecorator;
//!
//! let config = WebServerConfigBuilder::new(NoSession)
//!     .add("/", handler_fn(|_: &HttpRequest, response: &mut dyn HttpResponse, _: &mut ()| {
//!         response.send_text(StatusCode::OK, &mime::TEXT_PLAIN, "hello world", Charset::Utf8);
//!         Ok(())
//!     }))
//!     .with_decorator(RequestLogDecorator)
//!     .build();
//!
//! let server = WebServer::builder(config).address("127.0.0.1:8080").build().expect("valid config").start().expect("bind");
//! println!("listening on {}", server.local_addr());
//! # server.dispose();
//! ```
//!
//! # Modules
//!
//! - [`router`]: exact-path routing with a `404` fallback
//! - [`decorator`]: build-time wrapping of the routed handler
//! - [`config`]: routes, WebSocket routes, session factory and tunables in one builder
//! - [`acceptor`]: the accept loop and its round-robin distributor
//! - [`connector`]: blocking client sockets
//! - [`serializer`]: pluggable typed message encoding

pub mod acceptor;
pub mod config;
pub mod connector;
pub mod decorator;
pub mod router;
pub mod serializer;
mod server;

#[cfg(test)]
mod test_support;

pub use config::{WebServerConfig, WebServerConfigBuilder};
pub use router::Router;
pub use server::{ServerBuildError, ServerBuilder, ServerHandle, WebServer};
