use std::io;
use std::sync::Arc;

use tracing::{debug, error};

use crate::context::Context;
use crate::handler::{compose, Handler, HandlerRef, MiddlewareRef};
use crate::router::Router;

/// Body buffered when no route matches.
pub const NOT_FOUND_BODY: &[u8] = b"404 page not found";

/// Innermost step of the chain: route lookup and handler invocation.
struct RouteHandler {
    router: Arc<Router>,
}

impl Handler for RouteHandler {
    fn handle(&self, ctx: &mut Context<'_>) {
        match self.router.lookup(ctx.method(), ctx.path()) {
            Ok(matched) => {
                ctx.set_route(matched.path_params, matched.matched_path);
                matched.handler.handle(ctx);
            }
            Err(miss) => {
                debug!(
                    method = %ctx.method(),
                    path = %ctx.path(),
                    request_id = %ctx.request_id(),
                    reason = ?miss,
                    "route not found"
                );
                ctx.status = 404;
                ctx.resp_data = NOT_FOUND_BODY.to_vec();
            }
        }
    }
}

/// Composed request pipeline.
///
/// Built once at startup; the router and chain are immutable afterwards, so
/// one dispatcher is shared by every worker thread.
pub struct Dispatcher {
    router: Arc<Router>,
    chain: HandlerRef,
    layers: usize,
}

impl Dispatcher {
    /// Compose `middlewares` around routing over `router`.
    ///
    /// `middlewares[0]` becomes the outermost layer.
    #[must_use]
    pub fn new(router: Router, middlewares: Vec<MiddlewareRef>) -> Self {
        Self::from_shared(Arc::new(router), &middlewares)
    }

    #[must_use]
    pub fn from_shared(router: Arc<Router>, middlewares: &[MiddlewareRef]) -> Self {
        let terminal: HandlerRef = Arc::new(RouteHandler {
            router: Arc::clone(&router),
        });
        let chain = compose(terminal, middlewares);
        debug!(middleware_count = middlewares.len(), "dispatch chain built");
        Self {
            router,
            chain,
            layers: middlewares.len(),
        }
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Number of middleware layers around routing.
    #[must_use]
    pub fn middleware_count(&self) -> usize {
        self.layers
    }

    /// The composed chain, without the flush step.
    #[must_use]
    pub fn chain(&self) -> &HandlerRef {
        &self.chain
    }

    /// Run the exchange through the chain, then flush its buffered status
    /// and body to the response sink.
    ///
    /// # Errors
    ///
    /// Propagates sink write failures, including short writes.
    pub fn dispatch(&self, ctx: &mut Context<'_>) -> io::Result<()> {
        self.chain.handle(ctx);
        ctx.flush().inspect_err(|err| {
            error!(
                method = %ctx.method(),
                path = %ctx.path(),
                request_id = %ctx.request_id(),
                error = %err,
                "failed to flush response"
            );
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("router", &self.router)
            .field("layers", &self.layers)
            .finish_non_exhaustive()
    }
}
