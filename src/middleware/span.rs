use std::sync::Arc;
use std::time::Instant;

use http::HeaderMap;
use opentelemetry::propagation::{Extractor, TextMapPropagator};
use opentelemetry::trace::TraceContextExt;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing::{field, info_span};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::handler::{handler, middleware, HandlerRef, MiddlewareRef};

/// Reads propagation fields out of request headers.
struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(http::HeaderName::as_str).collect()
    }
}

/// Builds a middleware that runs the inner chain inside a `request` span.
///
/// The span opens with the method, path and request id. An incoming W3C
/// `traceparent` header becomes the span's OpenTelemetry parent, and its ids
/// are recorded as `trace_id` and `parent_span_id`. Once the inner chain
/// returns the span records the matched route template (also used as
/// `otel.name`), the buffered status and the latency.
#[derive(Clone)]
pub struct TracingBuilder {
    propagator: Arc<dyn TextMapPropagator + Send + Sync>,
}

impl std::fmt::Debug for TracingBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracingBuilder").finish_non_exhaustive()
    }
}

impl Default for TracingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            propagator: Arc::new(TraceContextPropagator::new()),
        }
    }

    /// Replace the W3C trace-context propagator, e.g. with a composite one.
    #[must_use]
    pub fn propagator<P>(mut self, propagator: P) -> Self
    where
        P: TextMapPropagator + Send + Sync + 'static,
    {
        self.propagator = Arc::new(propagator);
        self
    }

    #[must_use]
    pub fn build(self) -> MiddlewareRef {
        let propagator = self.propagator;
        middleware(move |next: HandlerRef| {
            let propagator = Arc::clone(&propagator);
            handler(move |ctx| {
                let span = info_span!(
                    "request",
                    method = %ctx.method(),
                    path = %ctx.path(),
                    request_id = %ctx.request_id(),
                    "otel.name" = field::Empty,
                    "otel.kind" = "server",
                    trace_id = field::Empty,
                    parent_span_id = field::Empty,
                    route = field::Empty,
                    status = field::Empty,
                    latency_us = field::Empty,
                );

                let parent = propagator.extract(&HeaderExtractor(ctx.request().headers()));
                let remote = parent.span().span_context().clone();
                if remote.is_valid() {
                    span.record("trace_id", field::display(remote.trace_id()));
                    span.record("parent_span_id", field::display(remote.span_id()));
                }
                // No-op unless an OpenTelemetry layer is installed
                #[allow(clippy::let_underscore_must_use, clippy::let_unit_value)]
                let _ = span.set_parent(parent);

                let _entered = span.enter();
                let started = Instant::now();
                next.handle(ctx);
                let route = ctx.matched_path().unwrap_or("unknown");
                let name = format!("{} {route}", ctx.method());
                span.record("otel.name", name.as_str());
                span.record("route", route);
                span.record("status", ctx.status);
                span.record("latency_us", started.elapsed().as_micros() as u64);
            })
        })
    }
}
