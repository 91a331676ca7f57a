use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::error;

use crate::context::Context;
use crate::handler::{handler, middleware, HandlerRef, MiddlewareRef};

/// Called after a panic was caught, with the context already rewritten and
/// the panic message.
pub type RecoverLogFn = Arc<dyn Fn(&Context<'_>, &str) + Send + Sync>;

/// Builds a middleware that turns a panic anywhere further in into a fixed
/// response.
///
/// Without a log function the panic is reported through `tracing::error!`.
#[derive(Clone)]
pub struct RecoverBuilder {
    status: u16,
    body: Vec<u8>,
    log_fn: Option<RecoverLogFn>,
}

impl Default for RecoverBuilder {
    fn default() -> Self {
        Self::new(500, b"Internal Server Error".to_vec())
    }
}

impl RecoverBuilder {
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
            log_fn: None,
        }
    }

    #[must_use]
    pub fn log_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Context<'_>, &str) + Send + Sync + 'static,
    {
        self.log_fn = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn build(self) -> MiddlewareRef {
        let settings = Arc::new(self);
        middleware(move |next: HandlerRef| {
            let settings = Arc::clone(&settings);
            handler(move |ctx| {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| next.handle(ctx)));
                let Err(payload) = outcome else {
                    return;
                };
                ctx.status = settings.status;
                ctx.resp_data.clone_from(&settings.body);
                let message = panic_message(payload.as_ref());
                match &settings.log_fn {
                    Some(log) => log(ctx, &message),
                    None => error!(
                        method = %ctx.method(),
                        path = %ctx.path(),
                        request_id = %ctx.request_id(),
                        panic = %message,
                        "handler panicked"
                    ),
                }
            })
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
