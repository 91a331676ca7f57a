mod common;

use common::wire::{header, parse_parts, send_request};
use lr::middleware::{ErrorPageBuilder, RecoverBuilder};
use lr::runtime_config::RuntimeConfig;
use lr::{HttpServer, ServerHandle};
use serde_json::{json, Value};

fn start_demo() -> ServerHandle {
    start_with(RuntimeConfig {
        workers: 2,
        ..RuntimeConfig::default()
    })
}

fn start_with(config: RuntimeConfig) -> ServerHandle {
    let mut server = HttpServer::with_config(config);
    server
        .use_middleware(ErrorPageBuilder::new().add_code(404, "nothing here").build())
        .use_middleware(RecoverBuilder::default().build());

    server
        .get("/user/:id", |ctx| match ctx.path_value("id").int64() {
            Ok(id) => ctx.respond_json_ok(&json!({ "id": id })).unwrap(),
            Err(err) => ctx.respond_text(400, err.to_string()),
        })
        .unwrap();
    server
        .post("/echo", |ctx| {
            let name = ctx.form_value("name").string().unwrap_or("?").to_string();
            ctx.set_header("X-Echo", &name);
            ctx.respond_text(201, format!("hi {name}"));
        })
        .unwrap();
    server.get("/panic", |_ctx| panic!("handler blew up")).unwrap();

    let handle = server.start("127.0.0.1:0").unwrap();
    handle.wait_ready().unwrap();
    handle
}

#[test]
fn test_serves_json_route() {
    let handle = start_demo();
    let resp = send_request(
        &handle.addr(),
        "GET /user/7 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    let (status, headers, body) = parse_parts(&resp);
    assert_eq!(status, 200);
    assert_eq!(header(&headers, "content-type"), Some("application/json"));
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value, json!({ "id": 7 }));
    handle.stop();
}

#[test]
fn test_bad_param_and_unknown_path() {
    let handle = start_demo();

    let resp = send_request(
        &handle.addr(),
        "GET /user/abc HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    let (status, _, body) = parse_parts(&resp);
    assert_eq!(status, 400);
    assert!(body.contains("abc"), "{body}");

    let resp = send_request(
        &handle.addr(),
        "GET /user/7/extra HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    let (status, _, body) = parse_parts(&resp);
    assert_eq!(status, 404);
    assert_eq!(body, "nothing here");
    handle.stop();
}

#[test]
fn test_form_post_with_custom_header() {
    let handle = start_demo();
    let body = "name=ann";
    let req = format!(
        "POST /echo HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
         Content-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    let (status, headers, body) = parse_parts(&send_request(&handle.addr(), &req));
    assert_eq!(status, 201);
    assert_eq!(header(&headers, "x-echo"), Some("ann"));
    assert_eq!(body, "hi ann");
    handle.stop();
}

#[test]
fn test_panic_is_recovered_and_server_keeps_serving() {
    let handle = start_demo();
    let resp = send_request(
        &handle.addr(),
        "GET /panic HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    let (status, _, body) = parse_parts(&resp);
    assert_eq!(status, 500);
    assert_eq!(body, "Internal Server Error");

    let resp = send_request(
        &handle.addr(),
        "GET /user/1 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    assert_eq!(parse_parts(&resp).0, 200);
    handle.stop();
}

#[test]
fn test_stop_releases_workers() {
    let handle = start_demo();
    let addr = handle.addr();
    assert_ne!(addr.port(), 0);
    handle.stop();
}

#[test]
fn test_oversized_body_is_rejected_before_dispatch() {
    let handle = start_with(RuntimeConfig {
        workers: 1,
        max_form_bytes: 8,
        ..RuntimeConfig::default()
    });

    let big = "a".repeat(64 * 1024);
    let req = format!(
        "POST /echo HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
         Content-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{big}",
        big.len()
    );
    let (status, _, body) = parse_parts(&send_request(&handle.addr(), &req));
    assert_eq!(status, 413);
    assert_eq!(body, "Payload Too Large");

    // No declared length: the cap is enforced while reading
    let req = "POST /echo HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
               Transfer-Encoding: chunked\r\n\r\n10\r\nname=0123456789a\r\n0\r\n\r\n";
    let (status, _, _) = parse_parts(&send_request(&handle.addr(), req));
    assert_eq!(status, 413);

    let body = "name=ann";
    let req = format!(
        "POST /echo HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
         Content-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    let (status, _, body) = parse_parts(&send_request(&handle.addr(), &req));
    assert_eq!(status, 201);
    assert_eq!(body, "hi ann");
    handle.stop();
}

#[test]
fn test_shutdown_trigger_releases_join() {
    let handle = start_demo();
    let trigger = handle.shutdown_trigger();
    let joiner = std::thread::spawn(move || handle.join());
    trigger.fire();
    joiner.join().unwrap();
}
