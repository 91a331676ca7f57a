//! # Dispatcher Module
//!
//! Turns a frozen [`Router`](crate::Router) and a middleware list into the
//! single handler every request runs through.
//!
//! ## Request Flow
//!
//! 1. The composed chain runs, outermost middleware first
//! 2. The innermost step looks the request up in the router
//! 3. On a hit, path parameters and the matched template are stored on the
//!    context and the route's handler runs
//! 4. On a miss, the context is marked 404 with a short body and no handler runs
//! 5. Middleware "after" code runs on the way back out
//! 6. The buffered status and body are flushed to the response sink
//!
//! Because flushing happens after the outermost layer returns, any middleware
//! can rewrite the response an inner layer or the handler produced.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lr::{handler, middleware, BufferedResponse, Context, Dispatcher, HandlerRef, Router};
//!
//! let mut router = Router::new();
//! router.add_route(http::Method::GET, "/ping", handler(|ctx| ctx.respond_text(200, "pong")))?;
//!
//! let dispatcher = Dispatcher::new(router, vec![middleware(|next: HandlerRef| {
//!     handler(move |ctx| {
//!         next.handle(ctx);
//!         ctx.set_header("x-served-by", "lr");
//!     })
//! })]);
//!
//! let mut out = BufferedResponse::new();
//! let req = http::Request::get("/ping").body(Vec::new())?;
//! dispatcher.dispatch(&mut Context::new(req, &mut out))?;
//! assert_eq!(out.body, b"pong");
//! ```

mod core;

pub use core::{Dispatcher, NOT_FOUND_BODY};
