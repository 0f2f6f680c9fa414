//! Build-time composition of cross-cutting behavior around the routed handler.
//!
//! A [`Decorator`] turns one value into another, here the fully routed
//! `Arc<dyn Handler<S>>` into a wrapped handler. Decorators are applied exactly once
//! while a server configuration is built; the result is shared by every worker
//! reactor. Because the input is the router itself, a decorator only ever sees
//! requests that routing will dispatch, never the raw connection.
//!
//! - [`DecoratorComposer`]: chains two decorators, the second wrapping the first
//! - [`IdentityDecorator`]: the no-op starting point
//! - [`decorator_fn`]: adapts a closure
//! - [`RequestLogDecorator`]: one `tracing` event per handled request
//! - [`SendObserverDecorator`]: observes every send made while a request is handled

mod decorator_composer;
mod decorator_fn;
mod identity;
mod request_log;
mod send_observer;

pub use decorator_composer::DecoratorComposer;
pub use decorator_fn::{DecoratorFn, decorator_fn};
pub use identity::IdentityDecorator;
pub use request_log::{RequestLog, RequestLogDecorator};
pub use send_observer::{ObservedHandler, ObservedResponse, SendObserver, SendObserverDecorator};

pub trait Decorator<In> {
    type Out;

    fn decorate(&self, raw: In) -> Self::Out;
}

pub trait DecoratorExt<In>: Decorator<In> {
    /// `decorator` wraps the output of `self`.
    fn and_then<D>(self, decorator: D) -> DecoratorComposer<Self, D>
    where
        Self: Sized,
    {
        DecoratorComposer::new(self, decorator)
    }

    /// `self` wraps the output of `decorator`.
    fn compose<D>(self, decorator: D) -> DecoratorComposer<D, Self>
    where
        Self: Sized,
    {
        DecoratorComposer::new(decorator, self)
    }
}

impl<T: Decorator<In> + ?Sized, In> DecoratorExt<In> for T {}
