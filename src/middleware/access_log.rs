use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::context::Context;
use crate::handler::{handler, middleware, HandlerRef, MiddlewareRef};

/// Sink for serialized access-log lines.
pub type LogFn = Arc<dyn Fn(&str) + Send + Sync>;

/// One access-log record, serialized as a single JSON object. Empty fields
/// are omitted.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AccessLog {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub host: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub route: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub http_method: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub status: u16,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub request_id: String,
}

fn is_zero(status: &u16) -> bool {
    *status == 0
}

impl AccessLog {
    fn from_context(ctx: &Context<'_>) -> Self {
        Self {
            host: ctx.header("host").unwrap_or_default().to_string(),
            route: ctx.matched_path().unwrap_or_default().to_string(),
            path: ctx.path().to_string(),
            http_method: ctx.method().to_string(),
            status: ctx.status,
            request_id: ctx.request_id().to_string(),
        }
    }
}

/// Builds a middleware that emits one [`AccessLog`] line per request after
/// the inner chain returns.
///
/// The line is written even when the inner chain unwinds; the panic then
/// continues outward.
#[derive(Clone)]
pub struct AccessLogBuilder {
    log_fn: LogFn,
}

impl Default for AccessLogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessLogBuilder {
    /// Lines go to `tracing` at INFO under the `lr::access` target.
    #[must_use]
    pub fn new() -> Self {
        Self {
            log_fn: Arc::new(|line: &str| info!(target: "lr::access", "{line}")),
        }
    }

    /// Route lines to another logger.
    #[must_use]
    pub fn log_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.log_fn = Arc::new(f);
        self
    }

    #[must_use]
    pub fn build(self) -> MiddlewareRef {
        let log_fn = self.log_fn;
        middleware(move |next: HandlerRef| {
            let log_fn = Arc::clone(&log_fn);
            handler(move |ctx| {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| next.handle(ctx)));
                let record = AccessLog::from_context(ctx);
                match serde_json::to_string(&record) {
                    Ok(line) => log_fn(&line),
                    Err(err) => tracing::warn!(error = %err, "failed to serialize access log"),
                }
                if let Err(payload) = outcome {
                    panic::resume_unwind(payload);
                }
            })
        })
    }
}
