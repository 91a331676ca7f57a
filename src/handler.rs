//! Handler and middleware abstractions.
//!
//! A [`Handler`] consumes a mutable request [`Context`]. A [`Middleware`]
//! takes the next handler in the chain and returns a wrapped one, so a
//! middleware list composes into a single onion around the router: the
//! first middleware is the outermost layer, its "before" code runs first
//! and its "after" code runs last.
//!
//! Plain closures implement both traits, and the [`handler`] / [`middleware`]
//! helpers exist so closure signatures infer without annotations:
//!
//! ```rust,ignore
//! use lr::{handler, middleware, HandlerRef};
//!
//! let hello = handler(|ctx| {
//!     ctx.status = 200;
//!     ctx.resp_data = b"hello".to_vec();
//! });
//!
//! let timing = middleware(|next: HandlerRef| {
//!     handler(move |ctx| {
//!         let started = std::time::Instant::now();
//!         next.handle(ctx);
//!         tracing::debug!(elapsed_us = started.elapsed().as_micros() as u64, "handled");
//!     })
//! });
//! ```

use std::sync::Arc;

use crate::context::Context;

/// Request handler. Writes its result into the context's buffered status
/// and body rather than returning it.
pub trait Handler: Send + Sync {
    fn handle(&self, ctx: &mut Context<'_>);
}

impl<F> Handler for F
where
    F: Fn(&mut Context<'_>) + Send + Sync,
{
    fn handle(&self, ctx: &mut Context<'_>) {
        self(ctx)
    }
}

/// Shared handle to a handler. Routes, middleware layers and the composed
/// chain all hold these.
pub type HandlerRef = Arc<dyn Handler>;

/// Wraps a handler. Code placed before the call to `next.handle` runs on
/// the way in, code after it runs on the way out. Skipping the call
/// short-circuits everything further in, the router included.
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: HandlerRef) -> HandlerRef;
}

impl<F> Middleware for F
where
    F: Fn(HandlerRef) -> HandlerRef + Send + Sync,
{
    fn wrap(&self, next: HandlerRef) -> HandlerRef {
        self(next)
    }
}

pub type MiddlewareRef = Arc<dyn Middleware>;

/// Box a closure as a [`HandlerRef`].
pub fn handler<F>(f: F) -> HandlerRef
where
    F: Fn(&mut Context<'_>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Box a closure as a [`MiddlewareRef`].
pub fn middleware<F>(f: F) -> MiddlewareRef
where
    F: Fn(HandlerRef) -> HandlerRef + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Fold `middlewares` around `terminal`, last to first, so index 0 ends up
/// as the outermost layer.
#[must_use]
pub fn compose(terminal: HandlerRef, middlewares: &[MiddlewareRef]) -> HandlerRef {
    middlewares
        .iter()
        .rev()
        .fold(terminal, |next, layer| layer.wrap(next))
}
