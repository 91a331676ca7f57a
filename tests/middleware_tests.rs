mod common;

use common::exchange::{request, run, Trace};
use http::{Method, Request};
use lr::middleware::{
    AccessLogBuilder, ErrorPageBuilder, RecoverBuilder, TracingBuilder, DEFAULT_PAGE_CONTENT_TYPE,
};
use lr::{handler, middleware, Dispatcher, HandlerRef, MiddlewareRef, Router};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing_util::TestTracing;

const TRACEPARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

fn demo_router() -> Router {
    let mut router = Router::new();
    router
        .add_route(
            Method::GET,
            "/user/:id",
            handler(|ctx| {
                let id = ctx.path_value("id").string().unwrap_or_default().to_string();
                ctx.respond_text(200, format!("user {id}"));
            }),
        )
        .unwrap();
    router
        .add_route(Method::GET, "/boom", handler(|_ctx| panic!("kaboom")))
        .unwrap();
    router
        .add_route(
            Method::GET,
            "/fail",
            handler(|ctx| {
                ctx.status = 500;
                ctx.resp_data = b"stack trace".to_vec();
            }),
        )
        .unwrap();
    router
}

fn access_log(lines: &Trace) -> MiddlewareRef {
    let lines = lines.clone();
    AccessLogBuilder::new()
        .log_fn(move |line: &str| lines.push(line))
        .build()
}

#[test]
fn test_access_log_records_route_and_status() {
    let lines = Trace::default();
    let dispatcher = Dispatcher::new(demo_router(), vec![access_log(&lines)]);

    let req = Request::builder()
        .uri("/user/7")
        .header("host", "example.test")
        .body(Vec::new())
        .unwrap();
    let (result, _out) = run(&dispatcher, req);
    result.unwrap();

    let entries = lines.entries();
    assert_eq!(entries.len(), 1);
    let record: Value = serde_json::from_str(&entries[0]).unwrap();
    assert_eq!(record["host"], "example.test");
    assert_eq!(record["route"], "/user/:id");
    assert_eq!(record["path"], "/user/7");
    assert_eq!(record["http_method"], "GET");
    assert_eq!(record["status"], 200);
    assert_eq!(record["request_id"].as_str().map(str::len), Some(26));
}

#[test]
fn test_access_log_omits_empty_fields() {
    let lines = Trace::default();
    let dispatcher = Dispatcher::new(demo_router(), vec![access_log(&lines)]);

    let (result, _out) = run(&dispatcher, request(Method::GET, "/nowhere"));
    result.unwrap();

    let record: Value = serde_json::from_str(&lines.entries()[0]).unwrap();
    assert!(record.get("host").is_none());
    assert!(record.get("route").is_none());
    assert_eq!(record["status"], 404);
}

#[test]
fn test_error_page_replaces_body_only() {
    let pages = ErrorPageBuilder::new()
        .add_code(404, "<h1>missing</h1>")
        .add_code(500, "<h1>oops</h1>")
        .build();
    let dispatcher = Dispatcher::new(demo_router(), vec![pages]);

    let (result, out) = run(&dispatcher, request(Method::GET, "/nowhere"));
    result.unwrap();
    assert_eq!(out.status, Some(404));
    assert_eq!(out.body, b"<h1>missing</h1>");

    let (result, out) = run(&dispatcher, request(Method::GET, "/fail"));
    result.unwrap();
    assert_eq!(out.status, Some(500));
    assert_eq!(out.body, b"<h1>oops</h1>");

    let (result, out) = run(&dispatcher, request(Method::GET, "/user/1"));
    result.unwrap();
    assert_eq!(out.body, b"user 1");
}

#[test]
fn test_error_page_sets_its_content_type() {
    let pages = ErrorPageBuilder::new()
        .add_code(404, "<h1>missing</h1>")
        .add_code_with_type(500, "application/json", r#"{"error":"internal"}"#)
        .build();
    let dispatcher = Dispatcher::new(demo_router(), vec![pages]);

    let (result, out) = run(&dispatcher, request(Method::GET, "/nowhere"));
    result.unwrap();
    assert_eq!(out.header("content-type"), Some(DEFAULT_PAGE_CONTENT_TYPE));

    let (result, out) = run(&dispatcher, request(Method::GET, "/fail"));
    result.unwrap();
    assert_eq!(out.header("content-type"), Some("application/json"));
    assert_eq!(out.body, br#"{"error":"internal"}"#);

    // Untouched statuses keep the handler's own type
    let (result, out) = run(&dispatcher, request(Method::GET, "/user/1"));
    result.unwrap();
    assert_eq!(
        out.header("content-type"),
        Some("text/plain; charset=utf-8")
    );
}

#[test]
fn test_recover_turns_panic_into_response() {
    let trace = Trace::default();
    let outer_trace = trace.clone();
    let outer = middleware(move |next: HandlerRef| {
        let outer_trace = outer_trace.clone();
        handler(move |ctx| {
            next.handle(ctx);
            outer_trace.push(format!("outer.after {}", ctx.status));
        })
    });
    let logged = trace.clone();
    let recover = RecoverBuilder::new(503, "recovered")
        .log_fn(move |ctx, message| logged.push(format!("{} {message}", ctx.path())))
        .build();
    let dispatcher = Dispatcher::new(demo_router(), vec![outer, recover]);

    let (result, out) = run(&dispatcher, request(Method::GET, "/boom"));
    result.unwrap();
    assert_eq!(out.status, Some(503));
    assert_eq!(out.body, b"recovered");
    assert_eq!(trace.entries(), vec!["/boom kaboom", "outer.after 503"]);
}

#[test]
fn test_recover_defaults_and_leaves_normal_requests_alone() {
    let dispatcher = Dispatcher::new(demo_router(), vec![RecoverBuilder::default().build()]);

    let (result, out) = run(&dispatcher, request(Method::GET, "/boom"));
    result.unwrap();
    assert_eq!(out.status, Some(500));
    assert_eq!(out.body, b"Internal Server Error");

    let (result, out) = run(&dispatcher, request(Method::GET, "/user/3"));
    result.unwrap();
    assert_eq!(out.status, Some(200));
    assert_eq!(out.body, b"user 3");
}

#[test]
fn test_access_log_written_when_inner_recover_catches_panic() {
    let lines = Trace::default();
    let dispatcher = Dispatcher::new(
        demo_router(),
        vec![access_log(&lines), RecoverBuilder::default().build()],
    );

    let (result, out) = run(&dispatcher, request(Method::GET, "/boom"));
    result.unwrap();
    assert_eq!(out.status, Some(500));

    let record: Value = serde_json::from_str(&lines.entries()[0]).unwrap();
    assert_eq!(record["status"], 500);
    assert_eq!(record["route"], "/boom");
}

#[test]
fn test_access_log_survives_unwinding_to_outer_recover() {
    let lines = Trace::default();
    let dispatcher = Dispatcher::new(
        demo_router(),
        vec![RecoverBuilder::default().build(), access_log(&lines)],
    );

    let (result, out) = run(&dispatcher, request(Method::GET, "/boom"));
    result.unwrap();
    assert_eq!(out.status, Some(500));

    // Logged on the way out while the panic was still in flight
    let entries = lines.entries();
    assert_eq!(entries.len(), 1);
    let record: Value = serde_json::from_str(&entries[0]).unwrap();
    assert_eq!(record["route"], "/boom");
    assert!(record.get("status").is_none());
}

#[test]
fn test_tracing_span_records_route_and_status() {
    let tracing = TestTracing::init();
    let dispatcher = Dispatcher::new(demo_router(), vec![TracingBuilder::new().build()]);

    let (result, _out) = run(&dispatcher, request(Method::GET, "/user/9"));
    result.unwrap();

    assert_eq!(tracing.field("request", "method").as_deref(), Some("GET"));
    assert_eq!(tracing.field("request", "path").as_deref(), Some("/user/9"));
    assert_eq!(tracing.field("request", "route").as_deref(), Some("/user/:id"));
    assert_eq!(tracing.field("request", "status").as_deref(), Some("200"));
    assert!(tracing.field("request", "latency_us").is_some());
}

#[test]
fn test_tracing_span_marks_unmatched_route() {
    let tracing = TestTracing::init();
    let dispatcher = Dispatcher::new(demo_router(), vec![TracingBuilder::new().build()]);

    let (result, _out) = run(&dispatcher, request(Method::GET, "/nowhere"));
    result.unwrap();

    assert_eq!(tracing.field("request", "route").as_deref(), Some("unknown"));
    assert_eq!(tracing.field("request", "status").as_deref(), Some("404"));
}

#[test]
fn test_tracing_span_records_incoming_trace_context() {
    let tracing = TestTracing::init();
    let dispatcher = Dispatcher::new(demo_router(), vec![TracingBuilder::new().build()]);

    let req = Request::builder()
        .uri("/user/4")
        .header("traceparent", TRACEPARENT)
        .body(Vec::new())
        .unwrap();
    let (result, _out) = run(&dispatcher, req);
    result.unwrap();

    assert_eq!(
        tracing.field("request", "trace_id").as_deref(),
        Some("4bf92f3577b34da6a3ce929d0e0e4736")
    );
    assert_eq!(
        tracing.field("request", "parent_span_id").as_deref(),
        Some("00f067aa0ba902b7")
    );
    assert_eq!(
        tracing.field("request", "otel.name").as_deref(),
        Some("GET /user/:id")
    );
}

#[test]
fn test_tracing_span_ignores_malformed_traceparent() {
    let tracing = TestTracing::init();
    let dispatcher = Dispatcher::new(demo_router(), vec![TracingBuilder::new().build()]);

    let req = Request::builder()
        .uri("/user/4")
        .header("traceparent", "00-not-a-trace-01")
        .body(Vec::new())
        .unwrap();
    let (result, _out) = run(&dispatcher, req);
    result.unwrap();

    assert!(tracing.field("request", "trace_id").is_none());
    assert_eq!(tracing.field("request", "status").as_deref(), Some("200"));
}

#[test]
fn test_tracing_span_joins_remote_trace_under_opentelemetry() {
    use opentelemetry::trace::{TraceContextExt, TracerProvider as _};
    use tracing_opentelemetry::OpenTelemetrySpanExt;
    use tracing_subscriber::layer::SubscriberExt;

    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder().build();
    let subscriber = tracing_subscriber::Registry::default()
        .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("lr-tests")));
    let _guard = tracing::subscriber::set_default(subscriber);

    let seen = Arc::new(Mutex::new(None));
    let observed = Arc::clone(&seen);
    let mut router = Router::new();
    router
        .add_route(
            Method::GET,
            "/trace",
            handler(move |ctx| {
                let cx = tracing::Span::current().context();
                let trace_id = cx.span().span_context().trace_id().to_string();
                *observed.lock().unwrap() = Some(trace_id);
                ctx.respond_text(200, "traced");
            }),
        )
        .unwrap();
    let dispatcher = Dispatcher::new(router, vec![TracingBuilder::new().build()]);

    let req = Request::builder()
        .uri("/trace")
        .header("traceparent", TRACEPARENT)
        .body(Vec::new())
        .unwrap();
    let (result, _out) = run(&dispatcher, req);
    result.unwrap();

    assert_eq!(
        seen.lock().unwrap().as_deref(),
        Some("4bf92f3577b34da6a3ce929d0e0e4736")
    );
}
