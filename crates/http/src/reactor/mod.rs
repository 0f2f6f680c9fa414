//! Reactor-per-thread execution model.
//!
//! Each [`Reactor`] owns one OS thread running a current-thread tokio runtime. Socket
//! readiness is polled by that runtime; connections live as local tasks and are never
//! touched from another thread. The task queue is the only way in from outside.
//!
//! [`ReactorGroup`] ties an acceptor reactor and its workers to one lifetime.

mod context;
mod event_loop;
mod group;

pub use context::ReactorContext;
pub use event_loop::Reactor;
pub use group::ReactorGroup;
